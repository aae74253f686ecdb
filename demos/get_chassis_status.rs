use std::time::Duration;

use bmc_ipmi::Client;

fn yes_no(flag: bool) -> &'static str {
    if flag { "Yes" } else { "No" }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Example:
    //   cargo run --example get_chassis_status -- 192.168.1.10 [port]
    let mut args = std::env::args().skip(1);
    let host = args.next().ok_or("missing <host>")?;
    let port: u16 = match args.next() {
        Some(port) => port.parse()?,
        None => 623,
    };

    let mut client = Client::builder(host)
        .port(port)
        .timeout(Duration::from_secs(2))
        .retries(3)
        .retry_on_timeout(true)
        .build()?;

    let status = client.get_chassis_status()?;

    let power = if status.power_on() { "ON" } else { "OFF" };
    println!("Power:               {power}");

    let flags = [
        ("Power overload:", status.power_overload()),
        ("Interlock:", status.power_interlock()),
        ("Power fault:", status.main_power_fault()),
        ("Power control fault:", status.power_control_fault()),
    ];
    for (label, set) in flags {
        println!("{label:<21}{}", yes_no(set));
    }

    let policy = status.power_restore_policy();
    println!("Restore policy:      {policy:?}");
    println!("Last power event:    {:#04x}", status.last_power_event);
    println!("Misc chassis state:  {:#04x}", status.misc_chassis_state);

    Ok(())
}
