//! Unit tests for `strata_api` types.
