// SPDX-License-Identifier: Apache-2.0

//! Record tokenization throughput.
//!

use criterion::{Criterion, criterion_group, criterion_main};
use std::hint::black_box;
use survey_gis::prelude::*;

const SCHEMA: &str = "\
[parser]
tag_mode = none
comment_mark = \"#\"
coor_x = x
coor_y = y

[field]
name = id
type = int
separator = \",\"

[field]
name = code
type = text
change_case = upper
separator = \",\"

[field]
name = x
type = double
separator = \",\"

[field]
name = y
type = double
";

fn bench_read_line(c: &mut Criterion) {
    let schema = Schema::from_text(
        "bench.schema",
        SCHEMA,
        &NumericFormat::plain(),
        &Reporter::to_console(),
    )
    .expect("bench schema loads");

    let lines: Vec<String> = (0..1000)
        .map(|i| format!("{i},find{i},{}.25,{}.75", 1000 + i, 2000 + i))
        .collect();

    c.bench_function("read_line x1000", |b| {
        b.iter(|| {
            let mut reader = RecordReader::new(&schema);
            for line in &lines {
                black_box(reader.read_line(line));
            }
        })
    });
}

criterion_group!(benches, bench_read_line);
criterion_main!(benches);
