/// Arrow schema for the pivoted period table.
pub mod period {
    use std::sync::Arc;

    use arrow::array::{ArrayRef, Float64Array, StringArray, TimestampMillisecondArray, UInt64Array};
    use arrow::datatypes::{DataType, Field, Schema, TimeUnit};
    use arrow::error::ArrowError;
    use arrow::record_batch::RecordBatch;

    use crate::aggregate::PeriodReport;
    use crate::count_key::CountKey;

    /// Fixed leading columns, then one `UInt64` column per count key (named
    /// by its wire form), then the recomputed metrics.
    pub fn period_schema(columns: &[CountKey]) -> Schema {
        let mut fields = vec![
            Field::new(
                "surveyed_at",
                DataType::Timestamp(TimeUnit::Millisecond, Some("UTC".into())),
                false,
            ),
            Field::new("survey_name", DataType::Utf8, false),
        ];
        fields.extend(
            columns
                .iter()
                .map(|key| Field::new(key.to_string(), DataType::UInt64, false)),
        );
        fields.push(Field::new("total_count", DataType::UInt64, false));
        fields.push(Field::new("discovery_rate", DataType::Float64, false));
        fields.push(Field::new("rank", DataType::Utf8, false));
        Schema::new(fields)
    }

    impl PeriodReport {
        /// The report as one pivoted batch, rows in chronological order.
        /// Count keys a row never recorded are zero.
        pub fn to_record_batch(&self) -> Result<RecordBatch, ArrowError> {
            let schema = Arc::new(period_schema(&self.columns));

            let surveyed_at = TimestampMillisecondArray::from(
                self.rows
                    .iter()
                    .map(|r| r.record.surveyed_at.timestamp_millis())
                    .collect::<Vec<_>>(),
            )
            .with_timezone("UTC");
            let names = StringArray::from_iter_values(
                self.rows.iter().map(|r| r.record.survey_name.as_str()),
            );

            let mut arrays: Vec<ArrayRef> = vec![Arc::new(surveyed_at), Arc::new(names)];
            for key in &self.columns {
                let values = UInt64Array::from_iter_values(
                    self.rows.iter().map(|r| r.record.counts.get(key)),
                );
                arrays.push(Arc::new(values));
            }
            arrays.push(Arc::new(UInt64Array::from_iter_values(
                self.rows.iter().map(|r| r.total_count()),
            )));
            arrays.push(Arc::new(Float64Array::from_iter_values(
                self.rows.iter().map(|r| r.discovery_rate()),
            )));
            arrays.push(Arc::new(StringArray::from_iter_values(
                self.rows.iter().map(|r| r.rank().as_str()),
            )));

            RecordBatch::try_new(schema, arrays)
        }
    }
}
