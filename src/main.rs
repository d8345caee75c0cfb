use iso8211_reader::{Iso8211Reader, SubfieldValue};
use std::env;

fn main() {
    let args: Vec<String> = env::args().collect();

    if args.len() < 2 {
        eprintln!("Usage: {} <path-to-iso8211-file> [--records <N>]", args[0]);
        std::process::exit(1);
    }

    let path = &args[1];
    let mut max_records: usize = 10;
    if let Some(idx) = args.iter().position(|arg| arg == "--records") {
        match args.get(idx + 1).and_then(|s| s.parse().ok()) {
            Some(n) => max_records = n,
            None => {
                eprintln!("ERROR: --records flag requires a number.");
                std::process::exit(1);
            }
        }
    }

    println!("Reading ISO 8211 file: {}", path);
    println!("{}", "=".repeat(60));

    let mut reader = match Iso8211Reader::open(path) {
        Ok(reader) => reader,
        Err(e) => {
            eprintln!("\nERROR: Failed to open file");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    let ddr = match reader.ddr() {
        Ok(ddr) => ddr.clone(),
        Err(e) => {
            eprintln!("\nERROR: Failed to decode DDR");
            eprintln!("  {}", e);
            std::process::exit(1);
        }
    };

    println!("\nData Descriptive Record:");
    println!("  Record length: {} bytes", ddr.leader.record_length);
    println!("  Field area at: {}", ddr.leader.base_address);
    println!("  Fields: {}", ddr.fields().len());
    match ddr.root() {
        Ok(root) => println!("  Root field: {}", root.tag),
        Err(e) => println!("  Root field: <unresolved: {}>", e),
    }

    for field in ddr.fields() {
        let Some(description) = &field.description else {
            println!("  [{}] (field control)", field.tag);
            continue;
        };
        println!(
            "  [{}] {:?} {:?}, {} subfields",
            field.tag,
            description.structure,
            description.name,
            description.subfields.len()
        );
        for subfield in &description.subfields {
            println!(
                "      {} {} length={:?}",
                subfield.tag.as_deref().unwrap_or("-"),
                subfield.kind.code(),
                subfield.length
            );
        }
    }

    println!("\nData Records (first {}):", max_records);
    let mut total = 0;
    loop {
        match reader.next_record() {
            Ok(Some(record)) => {
                total += 1;
                if total > max_records {
                    continue;
                }
                println!(
                    "  #{}: {} bytes, fields: {}",
                    total,
                    record.leader.record_length,
                    record
                        .fields
                        .iter()
                        .map(|f| f.tag.as_str())
                        .collect::<Vec<_>>()
                        .join(", ")
                );
                for field in &record.fields {
                    match record.decode_field(&ddr, &field.tag) {
                        Ok(rows) => {
                            for row in rows {
                                let rendered: Vec<String> = row.iter().map(render).collect();
                                println!("      [{}] {}", field.tag, rendered.join(" "));
                            }
                        }
                        Err(e) => println!("      [{}] <undecodable: {}>", field.tag, e),
                    }
                }
            }
            Ok(None) => break,
            Err(e) => {
                eprintln!("\nERROR: Failed to decode data record");
                eprintln!("  {}", e);
                std::process::exit(1);
            }
        }
    }
    if total > max_records {
        println!("  ... and {} more", total - max_records);
    }
    println!("\nDone: {} data records.", total);
}

fn render(value: &SubfieldValue) -> String {
    match value {
        SubfieldValue::Text(s) => format!("{:?}", s),
        SubfieldValue::Integer(i) => i.to_string(),
        SubfieldValue::Unsigned(u) => u.to_string(),
        SubfieldValue::Real(r) => r.to_string(),
        SubfieldValue::Logical(b) => format!("{:#04x}", b),
        SubfieldValue::Bytes(b) => format!("{} bytes", b.len()),
    }
}
