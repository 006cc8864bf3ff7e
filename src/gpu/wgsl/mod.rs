use once_cell::sync::Lazy;
use wgpu::ShaderSource;

/// Helper to wrap WGSL source as a `wgpu::ShaderSource`
fn shader_source(source: &'static str) -> ShaderSource<'static> {
    ShaderSource::Wgsl(source.into())
}

/// All compute kernels, lazy-loaded once at startup.
pub static TERRAIN_BAKE_KERNEL: Lazy<ShaderSource<'static>> =
    Lazy::new(|| shader_source(include_str!("terrain_bake.wgsl")));
pub static AGENT_SIM_KERNEL: Lazy<ShaderSource<'static>> =
    Lazy::new(|| shader_source(include_str!("agent_sim.wgsl")));
pub static POI_PAINT_KERNEL: Lazy<ShaderSource<'static>> =
    Lazy::new(|| shader_source(include_str!("poi_paint.wgsl")));

#[cfg(test)]
mod tests {
    const KERNELS: [(&str, &str); 3] = [
        ("terrain_bake", include_str!("terrain_bake.wgsl")),
        ("agent_sim", include_str!("agent_sim.wgsl")),
        ("poi_paint", include_str!("poi_paint.wgsl")),
    ];

    // Words naga refuses at parse time; an identifier colliding with one
    // kills every pipeline built from the module.
    const RESERVED: [&str; 8] = [
        "target", "meta", "self", "std", "type", "handle", "active", "common",
    ];

    #[test]
    fn kernels_avoid_reserved_identifiers() {
        for (name, source) in KERNELS {
            for line in source.lines() {
                let line = line.split("//").next().unwrap_or("");
                for word in RESERVED {
                    // A declaration looks like `word:` or `let word =` /
                    // `var word =`; usage inside longer identifiers is fine
                    let declares = line
                        .split(|c: char| !(c.is_alphanumeric() || c == '_'))
                        .any(|tok| tok == word)
                        && (line.contains(&format!("{word}:"))
                            || line.contains(&format!("let {word} "))
                            || line.contains(&format!("var {word} ")));
                    assert!(
                        !declares,
                        "{name}.wgsl declares reserved identifier `{word}`: {line}"
                    );
                }
            }
        }
    }
}
