pub mod evaluate_triggers;
