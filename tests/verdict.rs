use approx::assert_abs_diff_eq;
use deep_voice_detector::{DecisionPolicy, DetectError, InferenceError, Label, Verdict};

fn verdict(preds: &[Option<f32>]) -> Result<Verdict, DetectError> {
    Verdict::from_predictions(preds.to_vec(), &DecisionPolicy::default())
}

#[test]
fn two_of_five_fake_is_fake() {
    let v = verdict(&[Some(0.9), Some(0.9), Some(0.1), Some(0.1), Some(0.1)]).unwrap();
    assert_eq!(v.fake_count, 2);
    assert_eq!(v.real_count, 3);
    assert_abs_diff_eq!(v.ratio, 0.4, epsilon = 1e-12);
    assert_eq!(v.label, Label::Fake);
}

#[test]
fn ratio_exactly_at_threshold_is_fake() {
    let mut preds = vec![Some(0.8f32); 3];
    preds.extend(std::iter::repeat(Some(0.2)).take(7));
    let v = verdict(&preds).unwrap();
    assert_eq!((v.fake_count, v.real_count), (3, 7));
    assert_eq!(v.label, Label::Fake);
}

#[test]
fn below_threshold_is_real() {
    let mut preds = vec![Some(0.99f32); 2];
    preds.extend(std::iter::repeat(Some(0.79)).take(8));
    let v = verdict(&preds).unwrap();
    assert_eq!(v.fake_count, 2);
    assert_eq!(v.label, Label::Real);
}

#[test]
fn nulls_are_kept_but_not_counted() {
    let v = verdict(&[None, Some(0.95), None, Some(0.1)]).unwrap();
    assert_eq!(v.predictions, vec![None, Some(0.95), None, Some(0.1)]);
    assert_eq!(v.fake_count + v.real_count, 2);
    assert_eq!(v.label, Label::Fake);
}

#[test]
fn all_null_is_an_error() {
    let err = verdict(&[None, None]).unwrap_err();
    assert!(matches!(err, DetectError::NoValidPredictions));
    assert_eq!(err.to_string(), "All inferences failed.");
    assert_eq!(err.status_code(), 500);
}

#[test]
fn failed_segments_become_nulls() {
    let results = vec![
        Ok(Some(0.9)),
        Err(InferenceError::EmptyOutput),
        Ok(None),
        Ok(Some(0.2)),
    ];
    let v = Verdict::from_results(&results, &DecisionPolicy::default()).unwrap();
    assert_eq!(v.predictions, vec![Some(0.9), None, None, Some(0.2)]);
    assert_eq!((v.fake_count, v.real_count), (1, 1));
}

#[test]
fn policy_thresholds_are_configurable() {
    let strict = DecisionPolicy {
        segment_threshold: 0.95,
        verdict_threshold: 0.5,
        ..DecisionPolicy::default()
    };
    let v = Verdict::from_predictions(vec![Some(0.9), Some(0.96)], &strict).unwrap();
    assert_eq!(v.fake_count, 1);
    assert_eq!(v.label, Label::Fake);
}
