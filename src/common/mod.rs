pub(crate) mod device_list;
pub(crate) mod event_hub;
