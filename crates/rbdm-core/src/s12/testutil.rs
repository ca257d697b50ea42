//! Test double for the NVM-driven modules: a pod backed by a register map
//! plus a scripted sequence of status-register read values.

use std::cell::RefCell;
use std::collections::{HashMap, VecDeque};
use std::rc::Rc;

use crate::error::Result;
use crate::pod::{CpuRegister, Pod};
use crate::target::Target;

const STAT_REGISTERS: [u16; 2] = [super::flash::FSTAT, super::eeprom::ESTAT];

/// One access the simulated pod saw, in issue order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Access {
    /// In-map byte read.
    ReadByte(u16),
    /// In-map byte write.
    WriteByte(u16, u8),
    /// Word write (in or out of map).
    WriteWord(u16, u16),
}

/// Shared state of the simulated controller.
#[derive(Default)]
pub struct NvmSim {
    /// Byte register backing store; writes land here, reads fall back to 0.
    pub regs: HashMap<u16, u8>,
    /// Values returned by successive status-register reads. When exhausted,
    /// reads return 0x00, which makes unfinished waits run into the poll
    /// budget.
    pub stat_script: VecDeque<u8>,
    /// Every access in order.
    pub log: Vec<Access>,
}

struct SimPod {
    sim: Rc<RefCell<NvmSim>>,
}

impl Pod for SimPod {
    fn device_name(&self) -> &'static str {
        "nvm sim"
    }
    fn pod_version(&mut self) -> Result<String> {
        Ok("nvm sim v0.0".into())
    }
    fn reset(&mut self) -> Result<()> {
        Ok(())
    }
    fn background(&mut self) -> Result<()> {
        Ok(())
    }
    fn go(&mut self) -> Result<()> {
        Ok(())
    }
    fn go_until(&mut self) -> Result<()> {
        Ok(())
    }
    fn tag_go(&mut self) -> Result<()> {
        Ok(())
    }
    fn trace1(&mut self) -> Result<()> {
        Ok(())
    }
    fn read_byte(&mut self, addr: u16) -> Result<u8> {
        self.read_bd_byte(addr)
    }
    fn read_word(&mut self, _addr: u16) -> Result<u16> {
        Ok(0)
    }
    fn read_bd_byte(&mut self, addr: u16) -> Result<u8> {
        let mut sim = self.sim.borrow_mut();
        sim.log.push(Access::ReadByte(addr));
        if STAT_REGISTERS.contains(&addr) {
            Ok(sim.stat_script.pop_front().unwrap_or(0x00))
        } else {
            Ok(sim.regs.get(&addr).copied().unwrap_or(0x00))
        }
    }
    fn read_bd_word(&mut self, _addr: u16) -> Result<u16> {
        Ok(0)
    }
    fn write_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        self.write_bd_byte(addr, data)
    }
    fn write_word(&mut self, addr: u16, data: u16) -> Result<()> {
        self.sim.borrow_mut().log.push(Access::WriteWord(addr, data));
        Ok(())
    }
    fn write_bd_byte(&mut self, addr: u16, data: u8) -> Result<()> {
        let mut sim = self.sim.borrow_mut();
        sim.log.push(Access::WriteByte(addr, data));
        sim.regs.insert(addr, data);
        Ok(())
    }
    fn write_bd_word(&mut self, addr: u16, data: u16) -> Result<()> {
        self.write_word(addr, data)
    }
    fn read_next(&mut self) -> Result<u16> {
        Ok(0)
    }
    fn write_next(&mut self, _data: u16) -> Result<()> {
        Ok(())
    }
    fn read_cpu_register(&mut self, _reg: CpuRegister) -> Result<u16> {
        Ok(0)
    }
    fn write_cpu_register(&mut self, _reg: CpuRegister, _data: u16) -> Result<()> {
        Ok(())
    }
    fn max_read_payload(&self) -> usize {
        16
    }
    fn max_write_payload(&self) -> usize {
        0xFF
    }
    fn read_area_chunk(&mut self, _addr: u16, len: usize) -> Result<Vec<u8>> {
        Ok(vec![0xFF; len])
    }
    fn write_area_chunk(&mut self, _addr: u16, _data: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// A target driving the simulated controller, with the given status script.
pub fn sim_target(stat_script: &[u8]) -> (Target, Rc<RefCell<NvmSim>>) {
    let sim = Rc::new(RefCell::new(NvmSim {
        stat_script: stat_script.iter().copied().collect(),
        ..NvmSim::default()
    }));
    let pod = SimPod { sim: sim.clone() };
    (Target::new(Box::new(pod)), sim)
}
