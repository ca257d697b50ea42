//! Probe command implementation

use super::CmdResult;
use rbdm_core::probe::autoprobe;
use rbdm_core::s12::bdm::Bdm;
use rbdm_core::s12::flash::Flash;
use rbdm_core::target::Target;

/// Identify the pod and the connected device.
pub fn run(target: &mut Target) -> CmdResult {
    println!("Pod:       {}", target.device_name());
    println!("Firmware:  {}", target.pod_version()?);

    target.reset()?;
    target.halt()?;

    let report = autoprobe(target)?;
    println!("Part ID:   0x{:04X}", report.part_id);
    match &report.derivative {
        Some(name) => println!("Device:    {}", name),
        None => println!("Device:    unknown"),
    }
    if let Some(family) = report.family {
        println!("Family:    MC9S12{}", family);
    }
    if let Some(kib) = report.flash_kib {
        println!("Flash:     {} KiB class", kib);
    }
    if !report.masks.is_empty() {
        println!("Masks:     {}", report.masks.join(", "));
    }
    if let Some(sizes) = report.sizes {
        println!("Registers: {} bytes", sizes.reg_space);
        println!("EEPROM:    {} bytes", sizes.eep_space);
        println!("RAM:       {} bytes", sizes.ram_space);
        println!("Flash/ROM: {} bytes allocated", sizes.alloc_rom_space);
    }

    let status = Bdm::new(target).status()?;
    println!("BDMSTS:    {:?}", status);

    // Legacy HC12 parts have no FSEC; only report security on S12.
    if report.part_id != 0 {
        let secured = Flash::new(target).secured()?;
        println!("Security:  {}", if secured { "SECURED" } else { "unsecured" });
    }

    Ok(())
}
