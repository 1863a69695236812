use super::{json_pretty, EXIT_SUCCESS};
use tessera_core::PlatformRegistry;

pub fn run(json: bool) -> Result<u8, String> {
    let registry = PlatformRegistry::builtin();
    if json {
        println!("{}", json_pretty(&registry.all())?);
    } else {
        for platform in registry.all() {
            println!("{platform}");
        }
    }
    Ok(EXIT_SUCCESS)
}
