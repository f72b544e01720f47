//! Deterministic resource names
//!
//! The facade and the provisioners must derive identical names from a
//! store name, so both go through these functions.

use std::net::IpAddr;

/// Port the object store gateway listens on
pub const RGW_PORT: u16 = 53390;

/// App label and name prefix of object store gateway resources
pub const RGW_APP_NAME: &str = "rook-ceph-rgw";

/// App label and name prefix of filesystem metadata server resources
pub const MDS_APP_NAME: &str = "rook-ceph-mds";

/// Secret data key holding the gateway certificate
pub const CERT_SECRET_KEY: &str = "cert";

const CERT_SECRET_PREFIX: &str = "rook-rgw-";
const CERT_SECRET_SUFFIX: &str = "-cert";

/// Name of the secret holding an object store's inline certificate
pub fn cert_secret_name(store: &str) -> String {
    format!("{}{}{}", CERT_SECRET_PREFIX, store, CERT_SECRET_SUFFIX)
}

/// Name of the gateway service and deployment for an object store
pub fn object_store_instance_name(store: &str) -> String {
    format!("{}-{}", RGW_APP_NAME, store)
}

/// Name of the metadata server deployment for a filesystem
pub fn file_system_instance_name(fs: &str) -> String {
    format!("{}-{}", MDS_APP_NAME, fs)
}

/// Client endpoint of a gateway reachable at `host`
pub fn rgw_endpoint(host: &str) -> String {
    match host.parse::<IpAddr>() {
        Ok(IpAddr::V6(ip)) => format!("[{}]:{}", ip, RGW_PORT),
        _ => format!("{}:{}", host, RGW_PORT),
    }
}
