//! Integration test modules.

mod route_import_test;
mod trainer_control_test;
