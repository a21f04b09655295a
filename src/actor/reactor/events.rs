pub mod notification;
pub mod pressure;
pub mod session;
pub mod tray;
