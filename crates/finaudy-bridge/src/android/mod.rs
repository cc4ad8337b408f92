// SPDX-License-Identifier: PMPL-1.0-or-later
// Copyright (c) 2026 Jonathan D.A. Jewell (hyperpolymath) <jonathan.jewell@open.ac.uk>
//
// Android host via JNI.
//
// Requires the Android NDK and targets `aarch64-linux-android` or
// `armv7-linux-androideabi`.
//
// ## Architecture notes
//
// The activity hands its `WebAppInterface` instance to native code through
// `com.finaudy.NativeBridge.nativeAttach(Object)`. Host calls are plain
// `void` methods on that object, looked up by name, so a capability is
// present exactly when the method exists on the attached class.
//
// Results come back through the static `NativeBridge.on*` natives below,
// which forward into the `CallbackDispatcher` registered with
// [`attach_dispatcher`]. The JNI symbol names are fixed, so the JVM, the
// interface and the dispatcher live in process-wide slots; everything past
// those slots is the injected dispatcher.
//
// The library is loaded by `System.loadLibrary` from the activity, not by a
// native activity, so the JVM is recorded from `JNI_OnLoad` (and again from
// `nativeAttach`) rather than taken from an NDK context.

#![cfg(target_os = "android")]
#![allow(non_snake_case)]

use std::ffi::c_void;
use std::panic::{AssertUnwindSafe, catch_unwind};
use std::sync::{Arc, OnceLock};

use jni::objects::{GlobalRef, JClass, JObject, JString, JValue};
use jni::sys::{JNI_VERSION_1_6, jboolean, jint};
use jni::{JNIEnv, JavaVM};
use tracing::{debug, error, info, warn};

use finaudy_core::error::{FinaudyError, Result};
use finaudy_core::types::{Capability, HostCall};

use crate::attachment::{self, AttachSlot};
use crate::dispatcher::CallbackDispatcher;
use crate::traits::HostSurface;

/// The JVM that loaded this library.
static VM: OnceLock<JavaVM> = OnceLock::new();

/// `WebAppInterface` instance attached by the activity.
static INTERFACE: AttachSlot<GlobalRef> = AttachSlot::new("WebAppInterface");

/// Dispatcher the JNI callbacks forward into.
static DISPATCHER: AttachSlot<Arc<CallbackDispatcher>> = AttachSlot::new("callback dispatcher");

// ---------------------------------------------------------------------------
// JNI bootstrap helpers
// ---------------------------------------------------------------------------

/// The recorded `JavaVM`. Errors (rather than panicking) when the host
/// has not loaded the library through `System.loadLibrary` yet.
fn java_vm() -> Result<&'static JavaVM> {
    attachment::recorded(&VM, "JavaVM")
}

fn record_vm(vm: JavaVM) {
    if VM.set(vm).is_ok() {
        debug!("JavaVM recorded");
    }
}

/// Run `f` with a `JNIEnv` for the current thread, attaching it if needed.
fn with_env<T>(f: impl FnOnce(&mut JNIEnv<'_>) -> Result<T>) -> Result<T> {
    let vm = java_vm()?;
    let mut env = vm
        .attach_current_thread()
        .map_err(|e| jni_err("attach_current_thread", e))?;
    f(&mut env)
}

/// Convenience: map any `jni::errors::Error` into `FinaudyError::Bridge`.
fn jni_err(context: &str, e: jni::errors::Error) -> FinaudyError {
    FinaudyError::Bridge(format!("{context}: {e}"))
}

fn interface() -> Option<GlobalRef> {
    INTERFACE.current()
}

/// JNI signature of the host method behind `capability`.
fn signature(capability: Capability) -> &'static str {
    match capability.arity() {
        0 => "()V",
        _ => "(Ljava/lang/String;)V",
    }
}

// ---------------------------------------------------------------------------
// Host
// ---------------------------------------------------------------------------

/// Android implementation of the host surface.
///
/// Zero-sized; all state lives on the Java side and in the attachment slot.
pub struct AndroidHost;

impl AndroidHost {
    /// Does not touch JNI; the first JNI call happens lazily.
    pub fn new() -> Self {
        Self
    }
}

impl Default for AndroidHost {
    fn default() -> Self {
        Self::new()
    }
}

impl HostSurface for AndroidHost {
    fn platform_name(&self) -> &str {
        "Android"
    }

    fn has_capability(&self, capability: Capability) -> bool {
        let Some(iface) = interface() else {
            debug!(%capability, "no WebAppInterface attached");
            return false;
        };
        let found = with_env(|env| {
            let class = env
                .get_object_class(iface.as_obj())
                .map_err(|e| jni_err("GetObjectClass", e))?;
            match env.get_method_id(&class, capability.host_name(), signature(capability)) {
                Ok(_) => Ok(true),
                Err(_) => {
                    // The failed lookup leaves NoSuchMethodError pending.
                    let _ = env.exception_clear();
                    Ok(false)
                }
            }
        });
        match found {
            Ok(found) => found,
            Err(e) => {
                warn!(%capability, error = %e, "capability lookup failed");
                false
            }
        }
    }

    fn call(&self, call: &HostCall) -> Result<()> {
        let iface = interface().ok_or(FinaudyError::CapabilityUnavailable(call.capability))?;
        info!(capability = %call.capability, "Android: calling host");

        with_env(|env| {
            let mut strings = Vec::with_capacity(call.args.len());
            for arg in &call.args {
                let jstr = env
                    .new_string(arg)
                    .map_err(|e| jni_err("new_string(arg)", e))?;
                strings.push(JObject::from(jstr));
            }
            let args: Vec<JValue<'_, '_>> = strings.iter().map(JValue::Object).collect();

            let outcome = env.call_method(
                iface.as_obj(),
                call.capability.host_name(),
                signature(call.capability),
                &args,
            );
            if let Err(e) = outcome {
                let _ = env.exception_describe();
                let _ = env.exception_clear();
                return Err(jni_err(call.capability.host_name(), e));
            }
            Ok(())
        })
    }
}

// ---------------------------------------------------------------------------
// Dispatcher attachment
// ---------------------------------------------------------------------------

/// Route JNI callbacks into `dispatcher` until [`detach_dispatcher`].
pub fn attach_dispatcher(dispatcher: Arc<CallbackDispatcher>) {
    if DISPATCHER.attach(dispatcher) {
        info!("callback dispatcher replaced");
    } else {
        info!("callback dispatcher attached to JNI entry points");
    }
}

/// Stop routing JNI callbacks. Later callbacks are logged and dropped.
pub fn detach_dispatcher() {
    if DISPATCHER.detach() {
        info!("callback dispatcher detached");
    }
}

/// Run `f` against the attached dispatcher. Panics must not unwind into
/// the JVM, so they are caught and logged here.
fn with_dispatcher(callback: &str, f: impl FnOnce(&CallbackDispatcher)) {
    let dispatcher = match DISPATCHER.require() {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            warn!(callback, error = %e, "dropping host callback");
            return;
        }
    };
    if catch_unwind(AssertUnwindSafe(|| f(&dispatcher))).is_err() {
        error!(callback, "panic while dispatching host callback");
    }
}

/// Read a Java string; `null` reads as `None`.
fn read_string(env: &mut JNIEnv<'_>, value: &JString<'_>) -> Option<String> {
    if value.is_null() {
        return None;
    }
    match env.get_string(value) {
        Ok(s) => Some(s.into()),
        Err(e) => {
            warn!(error = %e, "unreadable string from host");
            None
        }
    }
}

// ---------------------------------------------------------------------------
// JNI exports: com.finaudy.NativeBridge
// ---------------------------------------------------------------------------

/// Called by the JVM when `System.loadLibrary` loads this library.
#[unsafe(no_mangle)]
pub extern "system" fn JNI_OnLoad(vm: JavaVM, _reserved: *mut c_void) -> jint {
    record_vm(vm);
    JNI_VERSION_1_6
}

/// `static native void nativeAttach(Object webAppInterface)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_nativeAttach<'local>(
    env: JNIEnv<'local>,
    _class: JClass<'local>,
    web_app_interface: JObject<'local>,
) {
    if VM.get().is_none() {
        match env.get_java_vm() {
            Ok(vm) => record_vm(vm),
            Err(e) => error!(error = %e, "failed to obtain JavaVM"),
        }
    }
    match env.new_global_ref(&web_app_interface) {
        Ok(global) => {
            INTERFACE.attach(global);
            info!("WebAppInterface attached");
        }
        Err(e) => error!(error = %e, "failed to pin WebAppInterface"),
    }
}

/// `static native void nativeDetach()`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_nativeDetach<'local>(
    _env: JNIEnv<'local>,
    _class: JClass<'local>,
) {
    if INTERFACE.detach() {
        info!("WebAppInterface detached");
    }
}

/// `static native void onPermissionResult(String name, boolean granted)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onPermissionResult<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    name: JString<'local>,
    granted: jboolean,
) {
    let name = read_string(&mut env, &name).unwrap_or_default();
    with_dispatcher("onPermissionResult", |d| {
        d.on_permission_result(&name, granted != 0);
    });
}

/// `static native void onGoogleSignInSuccess(String idToken, String accessToken)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onGoogleSignInSuccess<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    id_token: JString<'local>,
    access_token: JString<'local>,
) {
    let id_token = read_string(&mut env, &id_token).unwrap_or_default();
    let access_token = read_string(&mut env, &access_token);
    with_dispatcher("onGoogleSignInSuccess", |d| {
        d.on_google_sign_in_success(&id_token, access_token.as_deref());
    });
}

/// `static native void onGoogleSignInError(String message)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onGoogleSignInError<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    message: JString<'local>,
) {
    let message = read_string(&mut env, &message).unwrap_or_else(|| "unknown error".into());
    with_dispatcher("onGoogleSignInError", |d| {
        d.on_google_sign_in_error(&message);
    });
}

/// `static native void onFCMTokenReceived(String token)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onFCMTokenReceived<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    token: JString<'local>,
) {
    let token = read_string(&mut env, &token).unwrap_or_default();
    with_dispatcher("onFCMTokenReceived", |d| {
        d.on_fcm_token_received(&token);
    });
}

/// `static native void onGooglePlayPurchaseFinished(String purchaseToken, String productId)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onGooglePlayPurchaseFinished<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    purchase_token: JString<'local>,
    product_id: JString<'local>,
) {
    let purchase_token = read_string(&mut env, &purchase_token).unwrap_or_default();
    let product_id = read_string(&mut env, &product_id).unwrap_or_default();
    with_dispatcher("onGooglePlayPurchaseFinished", |d| {
        d.on_google_play_purchase_finished(&purchase_token, &product_id);
    });
}

/// `static native void onNotificationClicked(String notificationJson)`
///
/// The activity serialises the notification intent extras as
/// `{"data": {...}}` before calling in.
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onNotificationClicked<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    notification_json: JString<'local>,
) {
    let raw = read_string(&mut env, &notification_json).unwrap_or_default();
    with_dispatcher("onNotificationClicked", |d| {
        d.on_notification_clicked(&raw);
    });
}

/// `static native void onAudioRecordingComplete(String base64Audio)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onAudioRecordingComplete<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    base64_audio: JString<'local>,
) {
    let audio = read_string(&mut env, &base64_audio).unwrap_or_default();
    with_dispatcher("onAudioRecordingComplete", |d| {
        d.on_audio_recording_complete(&audio);
    });
}

/// `static native void onImageCaptureComplete(String imageDataUrl)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onImageCaptureComplete<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    image_data_url: JString<'local>,
) {
    let data_url = read_string(&mut env, &image_data_url).unwrap_or_default();
    with_dispatcher("onImageCaptureComplete", |d| {
        d.on_image_capture_complete(&data_url);
    });
}

/// `static native void onGalleryImageSelected(String imageDataUrl)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onGalleryImageSelected<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    image_data_url: JString<'local>,
) {
    let data_url = read_string(&mut env, &image_data_url).unwrap_or_default();
    with_dispatcher("onGalleryImageSelected", |d| {
        d.on_gallery_image_selected(&data_url);
    });
}

/// `static native void onFileSelected(String fileDataUrl, String fileName, String fileType)`
#[unsafe(no_mangle)]
pub extern "system" fn Java_com_finaudy_NativeBridge_onFileSelected<'local>(
    mut env: JNIEnv<'local>,
    _class: JClass<'local>,
    file_data_url: JString<'local>,
    file_name: JString<'local>,
    file_type: JString<'local>,
) {
    let data_url = read_string(&mut env, &file_data_url).unwrap_or_default();
    let file_name = read_string(&mut env, &file_name).unwrap_or_else(|| "unknown".into());
    let file_type = read_string(&mut env, &file_type).unwrap_or_default();
    with_dispatcher("onFileSelected", |d| {
        d.on_file_selected(&data_url, &file_name, &file_type);
    });
}
