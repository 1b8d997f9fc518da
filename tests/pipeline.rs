//! End-to-end pipeline tests against scripted collaborators

use aura_voice::intent::{Intent, IntentSource};
use aura_voice::pipeline::{APOLOGY, FALLBACK_TRANSCRIPT};
use aura_voice::{AudioFormat, ProcessError};

mod common;
use common::{Harness, RecordingClassifier, SPEECH, ScriptedSynthesizer, ScriptedTranscriber, wav_fixture};

#[tokio::test]
async fn time_question_is_answered_by_rules() {
    let h = Harness::new(ScriptedTranscriber::says("what time is it"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert_eq!(delivery.intent, Some(Intent::Time));
    assert_eq!(delivery.source, Some(IntentSource::Rules));
    assert!(!delivery.is_fallback);
    assert!(delivery.response_text.starts_with("It's "));
    assert!(delivery.response_text.ends_with('.'));
    assert!(delivery.response_text.contains(" on "));
    assert_eq!(h.classifier.call_count(), 0);
}

#[tokio::test]
async fn open_youtube_launches_the_site() {
    let h = Harness::new(ScriptedTranscriber::says("open youtube"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert_eq!(
        delivery.intent,
        Some(Intent::OpenApp {
            target: "youtube".to_string()
        })
    );
    assert_eq!(delivery.response_text, "Opening Youtube");
    assert_eq!(h.launcher.urls(), vec!["https://youtube.com".to_string()]);
    assert_eq!(h.synthesizer.spoken(), vec!["Opening Youtube".to_string()]);
}

#[tokio::test]
async fn play_request_becomes_youtube_search() {
    let h = Harness::new(ScriptedTranscriber::says("play bad guy"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert_eq!(
        delivery.intent,
        Some(Intent::Search {
            query: "bad guy".to_string()
        })
    );
    assert_eq!(delivery.response_text, "Playing bad guy on YouTube");
    assert_eq!(
        h.launcher.urls(),
        vec!["https://www.youtube.com/results?search_query=bad%20guy".to_string()]
    );
}

#[tokio::test]
async fn weather_in_city_is_title_cased() {
    let h = Harness::new(ScriptedTranscriber::says("weather in tokyo"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert_eq!(
        delivery.intent,
        Some(Intent::Weather {
            location: Some("tokyo".to_string())
        })
    );
    assert_eq!(delivery.response_text, "Showing weather for Tokyo");
    assert_eq!(h.launcher.urls().len(), 1);
}

#[tokio::test]
async fn unmatched_phrase_escalates_to_classifier() {
    let h = Harness::with_classifier(
        ScriptedTranscriber::says("compute the fibonacci sequence"),
        RecordingClassifier::answering(Intent::respond("I can't do math yet.")),
        ScriptedSynthesizer::working(),
    );

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert_eq!(h.classifier.call_count(), 1);
    assert_eq!(delivery.source, Some(IntentSource::Generative));
    assert_eq!(delivery.response_text, "I can't do math yet.");
    assert!(h.launcher.urls().is_empty());
}

#[tokio::test]
async fn unknown_classifier_intent_is_answered_politely() {
    let h = Harness::with_classifier(
        ScriptedTranscriber::says("book me a flight to paris"),
        RecordingClassifier::answering(Intent::Unknown {
            name: "book_flight".to_string(),
        }),
        ScriptedSynthesizer::working(),
    );

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert!(!delivery.is_fallback);
    assert_eq!(
        delivery.response_text,
        "I'm still learning! I can't handle that request yet."
    );
}

#[tokio::test]
async fn empty_transcript_is_rejected_without_leaking() {
    let h = Harness::new(ScriptedTranscriber::says("   "), ScriptedSynthesizer::working());

    let result = h.orchestrator.process(&wav_fixture(), AudioFormat::Wav).await;

    assert!(matches!(result, Err(ProcessError::NoSpeech)));
    assert_eq!(h.classifier.call_count(), 0);
    assert!(h.synthesizer.spoken().is_empty());
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn transcription_failure_falls_back_to_apology() {
    let h = Harness::new(ScriptedTranscriber::fails("provider down"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert!(delivery.is_fallback);
    assert_eq!(delivery.transcript, FALLBACK_TRANSCRIPT);
    assert_eq!(delivery.response_text, APOLOGY);
    assert_eq!(delivery.intent, None);
    assert_eq!(delivery.audio().await.unwrap(), SPEECH);
}

#[tokio::test]
async fn synthesis_failure_speaks_apology_instead() {
    let h = Harness::new(
        ScriptedTranscriber::says("open youtube"),
        ScriptedSynthesizer::failing_on("Opening Youtube"),
    );

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();

    assert!(delivery.is_fallback);
    assert_eq!(delivery.response_text, APOLOGY);
    assert_eq!(
        h.synthesizer.spoken(),
        vec!["Opening Youtube".to_string(), APOLOGY.to_string()]
    );
}

#[tokio::test]
async fn failed_apology_is_a_hard_error_and_cleans_up() {
    let h = Harness::new(ScriptedTranscriber::says("open youtube"), ScriptedSynthesizer::broken());

    let result = h.orchestrator.process(&wav_fixture(), AudioFormat::Wav).await;

    assert!(matches!(result, Err(ProcessError::AudioGeneration(_))));
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn delivery_owns_temp_files_until_dropped() {
    let h = Harness::new(ScriptedTranscriber::says("hello"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Webm)
        .await
        .unwrap();

    let audio_path = delivery.audio_path().unwrap().to_path_buf();
    assert!(audio_path.exists());
    assert_eq!(h.leftover_files(), 2);

    drop(delivery);
    assert!(!audio_path.exists());
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn released_resources_leave_nothing_behind() {
    let h = Harness::new(ScriptedTranscriber::says("thank you"), ScriptedSynthesizer::working());

    let delivery = h
        .orchestrator
        .process(&wav_fixture(), AudioFormat::Wav)
        .await
        .unwrap();
    assert_eq!(delivery.response_text, "You're welcome!");

    delivery.into_resources().release();
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn concurrent_requests_do_not_share_state() {
    let h = Harness::new(ScriptedTranscriber::says("what time is it"), ScriptedSynthesizer::working());
    let audio = wav_fixture();

    let runs = (0..8).map(|_| {
        let orchestrator = h.orchestrator.clone();
        let audio = audio.clone();
        tokio::spawn(async move { orchestrator.process(&audio, AudioFormat::Wav).await })
    });
    let deliveries: Vec<_> = futures::future::join_all(runs)
        .await
        .into_iter()
        .map(|joined| joined.unwrap().unwrap())
        .collect();

    let mut ids: Vec<_> = deliveries.iter().map(|d| d.request_id).collect();
    ids.sort();
    ids.dedup();
    assert_eq!(ids.len(), 8);
    assert_eq!(h.leftover_files(), 16);

    drop(deliveries);
    assert_eq!(h.leftover_files(), 0);
}

#[tokio::test]
async fn resolve_intent_reports_tier() {
    let h = Harness::new(ScriptedTranscriber::says(""), ScriptedSynthesizer::working());

    let (intent, source) = h.orchestrator.resolve_intent("open netflix please").await;
    assert_eq!(
        intent,
        Intent::OpenApp {
            target: "netflix".to_string()
        }
    );
    assert_eq!(source, IntentSource::Rules);

    let (intent, source) = h.orchestrator.resolve_intent("tell me about black holes").await;
    assert_eq!(intent, Intent::respond("From the model"));
    assert_eq!(source, IntentSource::Generative);
    assert_eq!(h.classifier.call_count(), 1);
}
