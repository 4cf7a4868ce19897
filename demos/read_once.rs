//! Takes a single temperature and humidity reading.
//!
//! ```
//! $ cargo run --example read_once
//!  T = 22.14°C
//! RH = 42.30%
//! ```

type Result<T> = std::result::Result<T, Box<dyn std::error::Error>>;

pub fn main() -> Result<()> {
    let sensor = atmoslog::Sensor::open(false)?;
    let reading = sensor.measure()?;

    println!(" T = {:.2}°C", reading.temperature_celsius);
    println!("RH = {:.2}%", reading.relative_humidity_pct);

    // dropping the sensor hands the device back to the kernel driver
    Ok(())
}
