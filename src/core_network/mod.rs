pub mod dtp;
pub mod network;
pub mod pasv;
pub mod port;
pub mod writer;
