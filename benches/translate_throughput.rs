//! Request body translation benchmarks.
//!
//! Run with: `cargo bench`

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use sparkpost_relay::translate::build_request_body;
use sparkpost_relay::{Attachment, MailMessage, ProviderSettings};
use std::hint::black_box;

fn message_with_recipients(count: usize) -> MailMessage {
    let mut message = MailMessage::new()
        .from(("sender@example.com", "Sender"))
        .subject("Benchmark email")
        .text("This is a test email body for benchmarking.")
        .html("<p>This is a test email body for benchmarking.</p>");

    for i in 0..count {
        message = match i % 3 {
            0 => message.to((format!("to{i}@example.com").as_str(), "Recipient")),
            1 => message.cc(format!("cc{i}@example.com").as_str()),
            _ => message.bcc(format!("bcc{i}@example.com").as_str()),
        };
    }
    message
}

fn benchmark_inline_body(c: &mut Criterion) {
    let settings = ProviderSettings {
        enable_tracking: true,
        ..ProviderSettings::new("benchmark-key")
    };

    let mut group = c.benchmark_group("inline_body");
    for recipients in [1_u64, 10, 100] {
        let message = message_with_recipients(usize::try_from(recipients).unwrap_or(1));
        group.throughput(Throughput::Elements(recipients));
        group.bench_with_input(
            BenchmarkId::new("recipients", recipients),
            &message,
            |b, message| {
                b.iter(|| build_request_body(black_box(message), &settings).unwrap());
            },
        );
    }
    group.finish();
}

fn benchmark_attachments(c: &mut Criterion) {
    let settings = ProviderSettings::new("benchmark-key");
    let payload = vec![0x5a_u8; 256 * 1024];
    let message = message_with_recipients(3)
        .attachment(Attachment::from_bytes("report.pdf", payload.clone()))
        .attachment(Attachment::from_bytes("data.bin", payload));

    let mut group = c.benchmark_group("attachments");
    group.throughput(Throughput::Bytes(512 * 1024));
    group.bench_function("encode_two_256k", |b| {
        b.iter(|| build_request_body(black_box(&message), &settings).unwrap());
    });
    group.finish();
}

fn benchmark_template_body(c: &mut Criterion) {
    let settings = ProviderSettings {
        template: Some("welcome".to_string()),
        ..ProviderSettings::new("benchmark-key")
    };
    let message = message_with_recipients(10);

    c.bench_function("template_body", |b| {
        b.iter(|| build_request_body(black_box(&message), &settings).unwrap());
    });
}

criterion_group!(
    benches,
    benchmark_inline_body,
    benchmark_attachments,
    benchmark_template_body,
);
criterion_main!(benches);
