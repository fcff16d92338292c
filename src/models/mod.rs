pub mod aws;
pub mod google;
pub mod ibm;
pub mod job;
pub mod microsoft;
pub mod word;

pub use aws::*;
pub use google::*;
pub use ibm::*;
pub use job::*;
pub use microsoft::*;
pub use word::*;
