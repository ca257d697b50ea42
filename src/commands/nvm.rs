//! Flash erase and unsecure command implementations

use rbdm_core::s12::eeprom::Eeprom;
use rbdm_core::s12::flash::Flash;
use rbdm_core::target::Target;

use super::CmdResult;

/// Mass-erase all flash banks and verify they are blank.
pub fn erase(target: &mut Target, osc_hz: u32) -> CmdResult {
    target.reset()?;
    target.halt()?;

    let mut flash = Flash::new(target);
    flash.set_clock_divider(osc_hz)?;
    flash.clear_errors(None)?;
    flash.erase_all()?;

    if flash.erase_verify()? {
        println!("Flash erased and blank");
    } else {
        return Err("flash erase completed but the array is not blank".into());
    }
    Ok(())
}

/// Unsecure a secured device by mass-erasing flash and EEPROM, then
/// optionally programming the security word back to the unsecured pattern.
pub fn unsecure(target: &mut Target, osc_hz: u32, lock: bool) -> CmdResult {
    target.reset()?;
    target.halt()?;

    if !Flash::new(target).secured()? {
        println!("Device is already unsecured");
        if !lock {
            return Ok(());
        }
    }

    let mut flash = Flash::new(target);
    flash.set_clock_divider(osc_hz)?;
    flash.clear_errors(None)?;
    flash.unsecure()?;
    println!("Flash erased");

    let mut eeprom = Eeprom::new(target);
    eeprom.set_clock_divider(osc_hz)?;
    eeprom.clear_errors()?;
    eeprom.unsecure()?;
    println!("EEPROM erased");

    // The new FSEC value is latched out of reset.
    target.reset()?;
    target.halt()?;

    if lock {
        let mut flash = Flash::new(target);
        flash.set_clock_divider(osc_hz)?;
        flash.lock_unsecure()?;
        println!("Security word programmed to the unsecured pattern");
    }

    match Flash::new(target).secured()? {
        false => println!("Device is unsecured"),
        true => return Err("device still reads as secured after the erase".into()),
    }
    Ok(())
}
