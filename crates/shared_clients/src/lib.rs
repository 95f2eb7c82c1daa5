pub mod acs;
pub mod openai;
