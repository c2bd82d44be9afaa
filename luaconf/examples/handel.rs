//! Walkthrough of the accessor surface on a small configuration.
//!
//! Run with `cargo run --example handel`.

use luaconf::Config;

const CONFIG: &str = r#"
last_name = "Handel"
full_name = "George Frideric Handel"
birth_year = 1685
death_age = 74
one_composition = "Messiah"
nationality = { "German", "British" }
name = { first = "George", middle = "Frideric", last = "Handel" }
compositions = {
  concerti_grossi_op_6 = { 1, 2, 3, 4, 5, 6, 7, 8, 9, 10, 11, 12 },
}
"#;

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let path = std::env::temp_dir().join("luaconf_example_handel.lua");
    std::fs::write(&path, CONFIG)?;

    let mut ops = Config::from_file(&path)?;

    // Basic access.
    let last_name: String = ops.get("last_name")?;
    println!("Last name: {last_name}");
    println!("Full name: {}", ops.get::<String>("full_name")?);

    let mut birth_year = 0i64;
    ops.set("birth_year", &mut birth_year)?;
    println!("Birth year: {birth_year}");

    let nationality: Vec<String> = ops.get("nationality")?;
    println!("Nationality: {}", nationality.join(", "));

    // List of entries.
    let entries = ops.get_entry_list("name")?;
    println!("Entries in \"name\": {}", entries.join(", "));
    println!("Middle name: {}", ops.get::<String>(&format!("name.{}", entries[2]))?);

    // The same, through a prefix.
    ops.set_prefix("name.");
    println!("Middle name: {}", ops.get::<String>(&entries[2])?);
    ops.clear_prefix();

    // Constraints are Lua expressions over `v`.
    let death_age: i64 = ops.get_checked("death_age", "v >= 0 and v < 150")?;
    println!("Death age: {death_age}");

    let composition: String =
        ops.get_checked("one_composition", "ops_in(v, {'Messiah', 'Water Music'})")?;
    println!("Composition: {composition}");

    // On a sequence, the constraint must hold for every element.
    let opus_6: Vec<i64> =
        ops.get_checked("compositions.concerti_grossi_op_6", "v < 13")?;
    println!("Concerti grossi op. 6: {} concertos", opus_6.len());

    // Default values for absent entries.
    let show: bool = ops.get_or("show_compositions", "", true)?;
    println!("Show compositions: {show}");

    // Everything read so far can be reproduced as a Lua document.
    println!("\n-- resolved configuration --\n{}", ops.lua_definition());

    std::fs::remove_file(&path).ok();
    Ok(())
}
