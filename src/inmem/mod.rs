pub(crate) mod accumulator;
