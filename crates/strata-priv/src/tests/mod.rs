//! Unit and behavioural tests for `strata_priv`.

mod unit;
