//! Gate for starting a new incubation cycle on a given calendar date.

use crate::model::Parameters;
use crate::species::resolve_cycle_length;
use chrono::NaiveDate;

/// Whether a cycle may start on `requested`, given the previous record.
///
/// No previous record means the first cycle, which is always allowed. A
/// requested date in the future, or before the previous start, is refused.
/// Otherwise the date is allowed when it lies past the end of the previous
/// cycle, when it is the previous start day itself (a restart), or when the
/// previous cycle has already run its course as of `today`.
pub fn can_start(requested: NaiveDate, parameters: Option<&Parameters>, today: NaiveDate) -> bool {
    let Some(parameters) = parameters else {
        tracing::debug!(%requested, "no previous cycle; start allowed");
        return true;
    };

    let cycle_days = i64::from(resolve_cycle_length(
        parameters.species,
        Some(i64::from(parameters.cycle_length_days)),
    ));

    if today < requested {
        tracing::debug!(%requested, %today, "requested date is in the future");
        return false;
    }
    if requested < parameters.start_date {
        tracing::debug!(
            %requested,
            start_date = %parameters.start_date,
            "requested date precedes the running cycle"
        );
        return false;
    }

    let since_request = (requested - parameters.start_date).num_days();
    let since_today = (today - parameters.start_date).num_days();
    let allowed = since_request > cycle_days || since_request < 1 || since_today > cycle_days;

    tracing::debug!(
        %requested,
        start_date = %parameters.start_date,
        cycle_days,
        since_request,
        since_today,
        allowed,
        "cycle start check"
    );
    allowed
}
