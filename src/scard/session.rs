//! PC/SC session handling
//!
//! Context establishment, reader enumeration, card-presence wait and
//! the single transmit path every applet command goes through.

use std::ffi::{CStr, CString};
use std::time::{Duration, Instant};

use log::{debug, trace};
use pcsc::{Card, Context, Protocols, ReaderState, Scope, ShareMode, State};

use crate::apdu::{ins, Command, Response};

use super::CardError;

/// Timeout of a single status-change poll
const PRESENCE_POLL: Duration = Duration::from_secs(1);

/// Overall budget to wait for cards before proceeding with whatever is
/// present
const PRESENCE_BUDGET: Duration = Duration::from_secs(5);

/// Establish the system PC/SC context
pub fn establish() -> Result<Context, CardError> {
    Ok(Context::establish(Scope::User)?)
}

/// Enumerate the connected reader names
pub fn list_readers(ctx: &Context) -> Result<Vec<CString>, CardError> {
    let mut buf = vec![0u8; ctx.list_readers_len()?];
    let readers = ctx
        .list_readers(&mut buf)?
        .map(CStr::to_owned)
        .collect::<Vec<_>>();
    debug!("found {} smart card reader(s)", readers.len());
    Ok(readers)
}

/// Wait until every reader holds a card, or the overall budget expires
///
/// Returns the readers that reached the present state, in enumeration
/// order.
pub fn wait_until_present(
    ctx: &Context,
    readers: &[CString],
) -> Result<Vec<CString>, CardError> {
    if readers.is_empty() {
        return Ok(Vec::new());
    }

    let deadline = Instant::now() + PRESENCE_BUDGET;
    let mut states: Vec<ReaderState> = readers
        .iter()
        .map(|r| ReaderState::new(r.clone(), State::UNAWARE))
        .collect();

    loop {
        match ctx.get_status_change(Some(PRESENCE_POLL), &mut states) {
            Ok(()) | Err(pcsc::Error::Timeout) => {}
            Err(err) => return Err(err.into()),
        }

        let present: Vec<CString> = states
            .iter()
            .filter(|s| s.event_state().contains(State::PRESENT))
            .map(|s| s.name().to_owned())
            .collect();

        if present.len() == readers.len() || Instant::now() >= deadline {
            debug!("{} of {} reader(s) hold a card", present.len(), readers.len());
            return Ok(present);
        }

        for state in &mut states {
            state.sync_current_state();
        }
    }
}

/// Connect to a reader in exclusive mode with protocol negotiation
pub fn connect(ctx: &Context, reader: &CStr) -> Result<Card, CardError> {
    Ok(ctx.connect(reader, ShareMode::Exclusive, Protocols::ANY)?)
}

/// Transmit a command APDU and split the response
pub fn transmit(card: &Card, command: &Command) -> Result<Response, CardError> {
    let raw = command.serialize()?;
    // never let PIN or key material reach the log
    if command.ins == ins::VERIFY {
        trace!("> {} [data redacted]", crate::tlv::hexify(&raw[..4]));
    } else {
        trace!("> {}", crate::tlv::hexify(&raw));
    }

    let mut recv = vec![0u8; pcsc::MAX_BUFFER_SIZE_EXTENDED];
    let raw_response = card.transmit(&raw, &mut recv)?;
    if command.ins == ins::PSO {
        trace!("< {} byte response [data redacted]", raw_response.len());
    } else {
        trace!("< {}", crate::tlv::hexify(raw_response));
    }

    Ok(Response::deserialize(raw_response)?)
}
