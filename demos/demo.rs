/* demos/demo.rs */

use realip::{ForwardedKeyMatch, HeaderSnapshot, Resolver, is_private_address, resolve};
use std::collections::HashMap;

fn main() {
    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::TRACE)
        .init();

    println!("=== Real IP Resolution Examples ===\n");

    // Example 1: No forwarding headers
    example_1_remote_addr();

    // Example 2: X-Forwarded-For chain
    example_2_x_forwarded_for();

    // Example 3: RFC 7239 Forwarded header
    example_3_forwarded();

    // Example 4: X-Real-IP as last resort
    example_4_x_real_ip();

    // Example 5: Plain header map
    example_5_header_map();

    // Example 6: Exact `for` key matching
    example_6_exact_key();

    // Example 7: Classifying addresses
    example_7_classify();

    println!("=== All examples completed! ===");
}

fn example_1_remote_addr() {
    println!("Example 1: No forwarding headers");

    let headers = HeaderSnapshot::new();
    println!("Resolved IP: {}", resolve("13.182.55.11:8080", &headers));
    println!();
}

fn example_2_x_forwarded_for() {
    println!("Example 2: X-Forwarded-For chain");

    let headers = HeaderSnapshot::new()
        .with_x_forwarded_for("127.0.0.1")
        .with_x_forwarded_for("192.168.1.10, 203.0.113.1, 198.51.100.7");

    println!("Occurrences: {:?}", headers.x_forwarded_for);
    println!("Resolved IP (first public hop): {}", resolve("10.0.0.5:41000", &headers));
    println!();
}

fn example_3_forwarded() {
    println!("Example 3: RFC 7239 Forwarded header");

    let headers = HeaderSnapshot::new()
        .with_forwarded(r#"for="[::1]";proto=https, for="[2001:db8:cafe::17]";by=10.0.0.1"#);

    println!("Forwarded: {}", headers.forwarded);
    println!("Resolved IP: {}", resolve("10.0.0.5:41000", &headers));
    println!();
}

fn example_4_x_real_ip() {
    println!("Example 4: X-Real-IP as last resort");

    let headers = HeaderSnapshot::new()
        .with_x_forwarded_for("10.1.2.3")
        .with_x_real_ip("192.168.1.100");

    println!("Resolved IP (verbatim X-Real-IP): {}", resolve("10.0.0.5:41000", &headers));
    println!();
}

fn example_5_header_map() {
    println!("Example 5: Plain header map");

    let mut map = HashMap::new();
    map.insert("X-Forwarded-For".to_string(), "172.16.4.4, 144.12.54.87".to_string());
    map.insert("User-Agent".to_string(), "curl/8.0".to_string());

    for (key, value) in &map {
        println!("  {}: {}", key, value);
    }

    let headers = HeaderSnapshot::from_map(&map);
    println!("Resolved IP: {}", resolve("", &headers));
    println!();
}

fn example_6_exact_key() {
    println!("Example 6: Exact `for` key matching");

    let headers = HeaderSnapshot::new().with_forwarded("x-forwarded-for=144.12.54.87");

    println!("Contains match: {:?}", resolve("", &headers));

    let exact = Resolver::new().forwarded_key_match(ForwardedKeyMatch::Exact);
    println!("Exact match: {:?}", exact.resolve("", &headers));
    println!();
}

fn example_7_classify() {
    println!("Example 7: Classifying addresses");

    for addr in ["172.15.0.0", "172.16.0.0", "172.31.0.0", "172.32.0.0", "fc00::", "unknown"] {
        match is_private_address(addr) {
            Ok(true) => println!("  {:<12} reserved", addr),
            Ok(false) => println!("  {:<12} public", addr),
            Err(err) => println!("  {:<12} {}", addr, err),
        }
    }
    println!();
}
