pub mod forms;
pub mod submissions;
pub mod webhooks;
