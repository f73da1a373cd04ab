// 测试用的平台协作者，记录所有调用

use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Mutex;

use super::{AudioPlayer, LocationProvider, LocationSink, VibrationDriver};
use crate::error::PlatformError;
use crate::models::{LocationRequest, LocationSample};

#[derive(Default)]
pub struct MockLocationProvider {
    pub last_known: Mutex<Option<LocationSample>>,
    pub deny_permission: AtomicBool,
    pub subscribe_calls: AtomicUsize,
    pub unsubscribe_calls: AtomicUsize,
    pub last_request: Mutex<Option<LocationRequest>>,
    pub sink: Mutex<Option<LocationSink>>,
}

impl MockLocationProvider {
    pub fn with_last_known(sample: LocationSample) -> Self {
        let provider = Self::default();
        *provider.last_known.lock().unwrap() = Some(sample);
        provider
    }

    pub fn sink(&self) -> LocationSink {
        self.sink.lock().unwrap().clone().expect("未订阅定位")
    }

    pub fn subscribes(&self) -> usize {
        self.subscribe_calls.load(Ordering::SeqCst)
    }

    pub fn unsubscribes(&self) -> usize {
        self.unsubscribe_calls.load(Ordering::SeqCst)
    }
}

#[async_trait::async_trait]
impl LocationProvider for MockLocationProvider {
    async fn subscribe(
        &self,
        request: LocationRequest,
        sink: LocationSink,
    ) -> Result<(), PlatformError> {
        self.subscribe_calls.fetch_add(1, Ordering::SeqCst);
        if self.deny_permission.load(Ordering::SeqCst) {
            return Err(PlatformError::PermissionDenied(
                "ACCESS_FINE_LOCATION".to_string(),
            ));
        }
        *self.last_request.lock().unwrap() = Some(request);
        *self.sink.lock().unwrap() = Some(sink);
        Ok(())
    }

    async fn unsubscribe(&self) -> Result<(), PlatformError> {
        self.unsubscribe_calls.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn last_known(&self) -> Option<LocationSample> {
        self.last_known.lock().unwrap().clone()
    }
}

#[derive(Default)]
pub struct MockAudioPlayer {
    pub fail_load: AtomicBool,
    pub fail_play: AtomicBool,
    pub load_calls: AtomicUsize,
    pub play_calls: AtomicUsize,
    pub stop_calls: AtomicUsize,
    pub release_calls: AtomicUsize,
    pub looping: AtomicBool,
    pub volumes: Mutex<Vec<f32>>,
}

impl MockAudioPlayer {
    pub fn plays(&self) -> usize {
        self.play_calls.load(Ordering::SeqCst)
    }

    pub fn stops(&self) -> usize {
        self.stop_calls.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.release_calls.load(Ordering::SeqCst)
    }

    pub fn volumes(&self) -> Vec<f32> {
        self.volumes.lock().unwrap().clone()
    }
}

impl AudioPlayer for MockAudioPlayer {
    fn load(&self, tone: &str) -> Result<(), PlatformError> {
        self.load_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_load.load(Ordering::SeqCst) {
            return Err(PlatformError::ResourceUnavailable(tone.to_string()));
        }
        Ok(())
    }

    fn set_looping(&self, looping: bool) -> Result<(), PlatformError> {
        self.looping.store(looping, Ordering::SeqCst);
        Ok(())
    }

    fn set_volume(&self, volume: f32) -> Result<(), PlatformError> {
        self.volumes.lock().unwrap().push(volume);
        Ok(())
    }

    fn play(&self) -> Result<(), PlatformError> {
        self.play_calls.fetch_add(1, Ordering::SeqCst);
        if self.fail_play.load(Ordering::SeqCst) {
            return Err(PlatformError::Driver("prepare failed".to_string()));
        }
        Ok(())
    }

    fn stop(&self) {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
    }

    fn release(&self) {
        self.release_calls.fetch_add(1, Ordering::SeqCst);
    }
}

#[derive(Default)]
pub struct MockVibrator {
    pub fail: AtomicBool,
    pub pulses: AtomicUsize,
    pub last_duration_ms: Mutex<Option<u64>>,
}

impl MockVibrator {
    pub fn pulses(&self) -> usize {
        self.pulses.load(Ordering::SeqCst)
    }
}

impl VibrationDriver for MockVibrator {
    fn vibrate(&self, duration_ms: u64) -> Result<(), PlatformError> {
        if self.fail.load(Ordering::SeqCst) {
            return Err(PlatformError::Driver("vibrator missing".to_string()));
        }
        self.pulses.fetch_add(1, Ordering::SeqCst);
        *self.last_duration_ms.lock().unwrap() = Some(duration_ms);
        Ok(())
    }
}
