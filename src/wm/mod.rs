//! Window Manager Module
//!
//! The window manager core. [`screen::Screen`] owns every window record,
//! workspace and the focus and stacking state; everything talks to the
//! server through [`xconn::XConn`].

pub mod application;
pub mod atoms;
pub mod client;
pub mod client_flags;
pub mod cycle;
pub mod error;
pub mod events;
pub mod ewmh;
pub mod focus;
pub mod frame;
pub mod hints;
pub mod icons;
pub mod keyboard;
pub mod manage;
pub mod notify;
pub mod process;
pub mod screen;
pub mod stacking;
pub mod state;
pub mod switchpanel;
pub mod window;
pub mod workspace;
pub mod x11;
pub mod xconn;

#[cfg(test)]
pub mod testing;

pub use screen::Screen;
pub use x11::X11Conn;
