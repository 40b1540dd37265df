//! Example demonstrating profile parsing and differential combination
//!
//! Run with: cargo run --package attune-core --example profile_demo

use attune_core::domain::combine::combine;
use attune_core::domain::dsp::EqChain;
use attune_core::domain::profile::parse_profile;

fn main() {
    // Initialize logging
    tracing_subscriber::fmt()
        .with_env_filter("attune_core=debug,info")
        .init();

    println!("=== Attune Profile Demo ===\n");

    // 1. Parse the correction for the headphone you own
    let mine_text = "\
Preamp: -4.2 dB
Filter 1: ON LSC Fc 105 Hz Gain 3.5 dB Q 0.70
Filter 2: ON PK Fc 1400 Hz Gain -2.0 dB Q 1.40
Filter 3: ON HSC Fc 9000 Hz Gain 1.5 dB Q 0.70
";
    println!("1. Parsing your headphone profile...");
    let mine = parse_profile(mine_text);
    println!(
        "   ✓ {} bands, preamp {:+.1} dB",
        mine.profile.bands.len(),
        mine.profile.preamp_db
    );

    // 2. Parse the profile of the headphone you want to sound like
    let target_text = "\
Preamp: -1.8 dB
Filter 1: ON LSC Fc 105 Hz Gain 1.0 dB Q 0.70
Filter 2: ON PK Fc 1400 Hz Gain 1.5 dB Q 1.00
Filter 3: ON HSC Fc 9000 Hz Gain -0.5 dB Q 0.70
";
    println!("\n2. Parsing the target headphone profile...");
    let target = parse_profile(target_text);
    println!(
        "   ✓ {} bands, preamp {:+.1} dB",
        target.profile.bands.len(),
        target.profile.preamp_db
    );

    // 3. Compute the differential correction
    println!("\n3. Combining (your correction minus the target's)...");
    let combined = combine(&mine.profile, Some(&target.profile));
    for (i, band) in combined.bands.iter().enumerate() {
        println!(
            "   band {}: {:?} Fc {:.0} Hz Gain {:+.2} dB Q {:.2}",
            i + 1,
            band.kind,
            band.center_frequency_hz,
            band.gain_db,
            band.q_factor,
        );
    }
    println!("   preamp: {:+.1} dB", combined.preamp_db);

    // 4. Render it as a processing chain and push a buffer through
    println!("\n4. Rendering as a 48 kHz stereo chain...");
    let mut chain = EqChain::from_filter_set(&combined, 48000, 2);
    println!("   ✓ {} stages", chain.len());

    let mut buffer: Vec<f32> = (0..512)
        .map(|i| (2.0 * std::f32::consts::PI * 440.0 * i as f32 / 48000.0).sin() * 0.5)
        .collect();
    chain.process(&mut buffer);
    println!("   ✓ processed {} samples", buffer.len());

    println!("\nDone.");
}
