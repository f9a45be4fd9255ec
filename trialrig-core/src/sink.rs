use crate::record::ResponseRecord;

/// Receives the sealed record of a trial and advances the experiment
pub trait TrialSink {
    fn finalize(&mut self, record: ResponseRecord);
}

impl TrialSink for Vec<ResponseRecord> {
    fn finalize(&mut self, record: ResponseRecord) {
        self.push(record);
    }
}
