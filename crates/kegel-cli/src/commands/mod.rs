pub mod helpers;
pub mod reminder;
pub mod run;
pub mod session;
pub mod settings;
pub mod stats;
