use std::time::Duration;

use bmc_ipmi::Client;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example get_device_id -- 192.168.1.10 [port]
    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("missing <host>")?;
    let port: u16 = match args.next() {
        Some(port) => port.parse()?,
        None => 623,
    };

    let mut client = Client::builder(host)
        .port(port)
        .timeout(Duration::from_secs(2))
        .build()?;

    let id = client.get_device_id()?;
    let (ipmi_major, ipmi_minor) = id.ipmi_version_pair();
    let firmware = format!("{}.{:02x}", id.firmware_major, id.firmware_minor);

    println!("Device ID:        {:#04x}", id.device_id);
    println!("Device Revision:  {}", id.device_revision);
    println!("Firmware Version: {firmware}");
    println!("IPMI Version:     {ipmi_major}.{ipmi_minor}");
    println!(
        "Manufacturer ID:  {:#08x} ({})",
        id.manufacturer_id,
        id.manufacturer_name().unwrap_or("Unknown")
    );
    println!("Product ID:       {:#06x}", id.product_id);
    println!("Aux Firmware Rev: {:02x?}", id.aux_firmware_revision);

    Ok(())
}
