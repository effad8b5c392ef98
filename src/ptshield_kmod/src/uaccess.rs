/*
Copyright 2025 The Ptshield Authors.

Licensed under the Apache License, Version 2.0 (the "License");
you may not use this file except in compliance with the License.
You may obtain a copy of the License at

    http://www.apache.org/licenses/LICENSE-2.0

Unless required by applicable law or agreed to in writing, software
distributed under the License is distributed on an "AS IS" BASIS,
WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
See the License for the specific language governing permissions and
limitations under the License.
*/

use core::cmp::min;

use ptshield_common::command::{ENVELOPE_SIZE, RawEnvelope};
use ptshield_common::uaccess::{UserAccess, UserPtr};
use tracing::{Span, instrument};

use crate::Result;
use crate::error::PtshieldError;

/// Validate `src` and copy one envelope from it into kernel memory.
///
/// This is the only place caller memory is read. The returned envelope is
/// a private copy; on any failure nothing that was read is returned.
#[instrument(err(Debug), skip(user), parent = Span::current(), level = "Trace")]
pub fn copy_envelope<U: UserAccess + ?Sized>(user: &U, src: UserPtr) -> Result<RawEnvelope> {
    if !user.access_ok(src, ENVELOPE_SIZE) {
        return Err(PtshieldError::InvalidArgument(src.addr(), ENVELOPE_SIZE));
    }

    let mut buf = [0u8; ENVELOPE_SIZE];
    let uncopied = user.copy_from_user(&mut buf, src);
    if uncopied != 0 {
        return Err(PtshieldError::NoData(
            src.addr(),
            ENVELOPE_SIZE,
            min(uncopied, ENVELOPE_SIZE),
        ));
    }
    Ok(RawEnvelope::from_bytes(buf))
}
