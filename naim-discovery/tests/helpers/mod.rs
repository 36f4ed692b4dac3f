//! Test helpers for fixture-based integration tests

use std::fs;
use std::path::PathBuf;

/// A device description fixture
#[derive(Debug, Clone)]
pub struct DeviceFixture {
    pub name: String,
    pub xml_content: String,
}

impl DeviceFixture {
    /// Load a fixture from the fixtures directory
    pub fn load(filename: &str) -> Self {
        let mut path = PathBuf::from(env!("CARGO_MANIFEST_DIR"));
        path.push("tests/fixtures");
        path.push(filename);

        let xml_content = fs::read_to_string(&path)
            .unwrap_or_else(|e| panic!("Failed to load fixture {}: {}", filename, e));

        Self {
            name: filename.to_string(),
            xml_content,
        }
    }
}

/// Build a NOTIFY datagram as a Naim device would send it.
pub fn notify_datagram(nts: &str, udn: &str, boot_id: u32, next_boot_id: Option<u32>) -> String {
    let next = next_boot_id
        .map(|id| format!("NEXTBOOTID.UPNP.ORG: {}\r\n", id))
        .unwrap_or_default();
    format!(
        "NOTIFY * HTTP/1.1\r\n\
         HOST: 239.255.255.250:1900\r\n\
         CACHE-CONTROL: max-age=1800\r\n\
         LOCATION: http://192.168.1.40:8080/description.xml\r\n\
         NT: urn:schemas-upnp-org:device:MediaRenderer:1\r\n\
         NTS: {}\r\n\
         SERVER: Linux/3.x UPnP/1.1 Naim/1.0\r\n\
         USN: {}::urn:schemas-upnp-org:device:MediaRenderer:1\r\n\
         BOOTID.UPNP.ORG: {}\r\n\
         {}\
         \r\n",
        nts, udn, boot_id, next
    )
}
