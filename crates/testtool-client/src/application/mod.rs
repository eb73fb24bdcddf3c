//! Application layer for the client.
//!
//! - **`lifecycle`** – The hooks a host application calls while it starts,
//!   loads its project, handles keys, and quits.  The network client is owned
//!   here and started once the project is loaded.

pub mod lifecycle;
