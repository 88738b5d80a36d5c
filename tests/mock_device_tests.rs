#![cfg(feature = "test-mock")]

use delaysyncrs::midi::{find_port, list_output_ports};
use delaysyncrs::*;

#[test]
fn test_device_list() {
    let devices = handle_device_list();
    assert_eq!(devices.len(), 2);
    assert_eq!(devices[0], "Mock Device 1");
    assert_eq!(devices[1], "Mock Device 2");
}

#[test]
fn test_valid_device_binding() {
    let devices = handle_device_list();
    let device_name = "Mock Device 1";
    assert!(
        devices.iter().any(|d| d.contains(device_name)),
        "Valid device '{}' should be found in device list",
        device_name
    );
}

#[test]
fn test_output_lookup() {
    let outputs = list_output_ports().unwrap();
    assert_eq!(find_port(&outputs, "Device 2").unwrap(), "Mock Device 2");
    assert!(matches!(find_port(&outputs, "Quadraverb"), Err(Error::DeviceNotFound(_))));
    assert_eq!(handle_output_list(), outputs);
}
