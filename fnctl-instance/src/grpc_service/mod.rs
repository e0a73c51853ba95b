mod control;

pub use control::InstanceControlService;
