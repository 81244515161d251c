pub mod batch;
pub mod run;
pub mod util;
pub mod validate;
