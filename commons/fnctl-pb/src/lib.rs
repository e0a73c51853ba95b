tonic::include_proto!("proto");
#[allow(dead_code)]
pub const FILE_DESCRIPTOR_SET: &[u8] =
    tonic::include_file_descriptor_set!("fnctl_descriptor");

pub use function_status::ExceptionInformation;
pub use metrics_data::DataDigest;

mod util;
