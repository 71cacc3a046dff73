pub mod ioport;
