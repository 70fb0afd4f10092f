//! Unit test modules.

mod fec_codec_test;
mod gatt_parser_test;
mod import_gpx_test;
mod physics_test;
mod route_test;
mod session_summary_test;
mod workout_engine_test;
mod workout_plan_test;
