// btdiscover Source Code File
//
// Copyright 2026 btdiscover contributors. All rights reserved.
//
// Licensed under the BSD 3-Clause license. See LICENSE file in the project root
// for full license information.

//! Stepwise driver for the classic device search.

use crate::api::{
    BDAddr, ClassicDeviceRecord, ClassicEnumerator, DeviceInfo, InquiryParams, SystemError,
    TransportSet,
};
use log::trace;

/// What a single classic search step produced.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum ClassicStep {
    Found(DeviceInfo),
    Exhausted,
    Failed(SystemError),
}

impl From<Result<ClassicDeviceRecord, SystemError>> for ClassicStep {
    fn from(result: Result<ClassicDeviceRecord, SystemError>) -> Self {
        match result {
            Ok(record) => ClassicStep::Found(classic_device_info(&record)),
            Err(SystemError::NO_MORE_ITEMS) => ClassicStep::Exhausted,
            Err(error) => ClassicStep::Failed(error),
        }
    }
}

pub(crate) fn classic_device_info(record: &ClassicDeviceRecord) -> DeviceInfo {
    DeviceInfo::new(
        BDAddr::from(record.address),
        record.name.clone(),
        record.class_of_device,
        TransportSet::CLASSIC,
    )
    .with_cached(record.remembered)
}

/// Opens a search. The handle is only returned alongside a found device.
pub(crate) fn find_first<E>(
    enumerator: &E,
    params: &InquiryParams,
) -> (Option<E::SearchHandle>, ClassicStep)
where
    E: ClassicEnumerator + ?Sized,
{
    trace!("Starting classic inquiry: {:?}", params);
    match enumerator.find_first(params) {
        Ok((record, handle)) => (Some(handle), ClassicStep::Found(classic_device_info(&record))),
        Err(error) => (None, ClassicStep::from(Err(error))),
    }
}

pub(crate) fn find_next<E>(enumerator: &E, handle: &E::SearchHandle) -> ClassicStep
where
    E: ClassicEnumerator + ?Sized,
{
    enumerator.find_next(handle).into()
}

/// Sole owner of the open search handle, if any.
#[derive(Debug)]
pub(crate) struct ClassicSearch<H> {
    handle: Option<H>,
}

impl<H> Default for ClassicSearch<H> {
    fn default() -> Self {
        ClassicSearch { handle: None }
    }
}

impl<H> ClassicSearch<H> {
    pub fn is_open(&self) -> bool {
        self.handle.is_some()
    }

    /// Takes the handle out so a background step can use it. It must come back via
    /// [`attach`](Self::attach).
    pub fn take(&mut self) -> Option<H> {
        self.handle.take()
    }

    /// Stores `handle`, closing any handle already held.
    pub fn attach<E>(&mut self, enumerator: &E, handle: H)
    where
        E: ClassicEnumerator<SearchHandle = H> + ?Sized,
    {
        self.close(enumerator);
        self.handle = Some(handle);
    }

    /// Closes the search. Does nothing when no handle is held.
    pub fn close<E>(&mut self, enumerator: &E)
    where
        E: ClassicEnumerator<SearchHandle = H> + ?Sized,
    {
        if let Some(handle) = self.handle.take() {
            trace!("Closing classic search");
            enumerator.close(handle);
        }
    }
}
