//! Fixture-based tests for device description fetching and presence routing
//!
//! These tests serve pre-captured description XML from a mock HTTP server, so
//! no real device is needed.

mod helpers;

use std::time::Duration;

use helpers::{notify_datagram, DeviceFixture};
use mockito::Server;
use naim_discovery::device::DeviceDescription;
use naim_discovery::{DeviceFactory, DiscoveryError, PresenceChange, PresenceListener, UpnpFactory};
use rstest::rstest;

#[rstest]
#[case("muso_device.xml", "Mu-so", "Kitchen Mu-so")]
#[case("muso_qb_device.xml", "Mu-so Qb 2nd Gen", "Study")]
fn test_parse_device_fixture(
    #[case] fixture_file: &str,
    #[case] expected_model: &str,
    #[case] expected_name: &str,
) {
    let fixture = DeviceFixture::load(fixture_file);
    let description = DeviceDescription::from_xml(&fixture.xml_content)
        .expect("Failed to parse device XML");

    assert!(description.is_naim_device(), "{} should be a Naim device", fixture.name);
    assert_eq!(description.model_name, expected_model);
    assert_eq!(description.friendly_name, expected_name);
}

#[tokio::test]
async fn test_factory_creates_device_from_location() {
    let fixture = DeviceFixture::load("muso_device.xml");
    let mut server = Server::new_async().await;
    let mock = server
        .mock("GET", "/description.xml")
        .with_status(200)
        .with_header("content-type", "text/xml")
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let factory = UpnpFactory::new(Duration::from_secs(2)).unwrap();
    let location = format!("{}/description.xml", server.url());
    let device = factory.create_device(&location).await.expect("device");

    mock.assert_async().await;
    assert_eq!(device.id, "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01");
    assert_eq!(device.ip_address, "127.0.0.1");
    assert_eq!(device.location, location);
    assert_eq!(device.serial_number.as_deref(), Some("320456"));
}

#[tokio::test]
async fn test_factory_rejects_other_vendor() {
    let fixture = DeviceFixture::load("other_renderer_device.xml");
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/description.xml")
        .with_status(200)
        .with_body(&fixture.xml_content)
        .create_async()
        .await;

    let factory = UpnpFactory::new(Duration::from_secs(2)).unwrap();
    let result = factory
        .create_device(&format!("{}/description.xml", server.url()))
        .await;

    assert!(matches!(result, Err(DiscoveryError::InvalidDevice(_))));
}

#[tokio::test]
async fn test_factory_http_error_reports_status() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/description.xml")
        .with_status(404)
        .create_async()
        .await;

    let factory = UpnpFactory::new(Duration::from_secs(2)).unwrap();
    let result = factory
        .create_device(&format!("{}/description.xml", server.url()))
        .await;

    assert_eq!(result, Err(DiscoveryError::HttpStatus(404)));
}

#[tokio::test]
async fn test_factory_malformed_xml_is_parse_error() {
    let mut server = Server::new_async().await;
    server
        .mock("GET", "/description.xml")
        .with_status(200)
        .with_body("<root><device>")
        .create_async()
        .await;

    let factory = UpnpFactory::new(Duration::from_secs(2)).unwrap();
    let result = factory
        .create_device(&format!("{}/description.xml", server.url()))
        .await;

    assert!(matches!(result, Err(DiscoveryError::ParseError(_))));
}

#[test]
fn test_listener_reboot_sequence() {
    let udn = "uuid:5f9ec1b3-ed59-79bb-4530-0002c0ffee01";
    let listener = PresenceListener::detached();
    let mut rx = listener.register(udn);

    listener.dispatch(&notify_datagram("ssdp:alive", udn, 7, None));
    listener.dispatch(&notify_datagram("ssdp:update", udn, 7, Some(8)));
    listener.dispatch(&notify_datagram("ssdp:alive", udn, 8, None));

    let first = rx.try_recv().unwrap();
    let update = rx.try_recv().unwrap();
    let second = rx.try_recv().unwrap();

    assert_eq!(first.change, PresenceChange::Alive);
    assert_eq!(update.change, PresenceChange::Update);
    assert_eq!(update.next_boot_id, Some(8));
    assert_eq!(second.boot_id, Some(8));
}
