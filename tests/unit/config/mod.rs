pub mod pipeline_options_test;
