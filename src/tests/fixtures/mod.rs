// Shared test fixtures, compiled only under cfg(test).

pub mod entries;
