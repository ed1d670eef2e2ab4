//! Unit test harness for kinematic-transform.
//!
//! This module organizes configuration tests that go through the public
//! parsing and validation entry points.

mod config_parsing;
mod config_validation;
