//! Host-side models of the hardware the core drives.

pub mod master;
pub mod systick;
pub mod timer;
pub mod usart;
