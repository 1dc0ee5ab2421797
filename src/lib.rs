pub mod btree;
pub mod config;
pub mod error;
pub mod front_door;
pub mod logging;
pub mod service;

#[rustfmt::skip]
pub mod lookup {
    tonic::include_proto!("lookup");

    pub const FILE_DESCRIPTOR_SET: &[u8] =
        tonic::include_file_descriptor_set!("lookup_descriptor");
}
