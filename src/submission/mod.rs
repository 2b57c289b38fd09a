pub mod client_ip;
pub mod fields;
pub mod honeypot;
pub mod parser;
pub mod pipeline;
pub mod validate;
