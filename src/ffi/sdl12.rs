//! Native backend: libSDL 1.2, SDL_image and SDL_gfx.
//!
//! Enabled with the `sdl12` cargo feature. Set `SDL_LIB_DIR` at build time
//! when the libraries are not on the default linker path.

use std::ffi::{c_char, c_double, c_int, c_void, CStr};
use std::ptr;

use super::native::NativeLibrary;
use super::types::{RawEvent, RawJoystick, RawPixelFormat, RawRect, RawSurface, RawVideoInfo};

#[link(name = "SDL")]
extern "C" {
    fn SDL_Init(flags: u32) -> c_int;
    fn SDL_InitSubSystem(flags: u32) -> c_int;
    fn SDL_QuitSubSystem(flags: u32);
    fn SDL_WasInit(flags: u32) -> u32;
    fn SDL_Quit();

    fn SDL_GetError() -> *const c_char;
    fn SDL_SetError(fmt: *const c_char, ...);
    fn SDL_ClearError();

    fn SDL_SetVideoMode(width: c_int, height: c_int, bpp: c_int, flags: u32) -> *mut RawSurface;
    fn SDL_VideoModeOK(width: c_int, height: c_int, bpp: c_int, flags: u32) -> c_int;
    fn SDL_ListModes(format: *mut RawPixelFormat, flags: u32) -> *mut *mut RawRect;
    fn SDL_GetVideoInfo() -> *const RawVideoInfo;
    fn SDL_UpdateRect(screen: *mut RawSurface, x: i32, y: i32, w: u32, h: u32);
    fn SDL_UpdateRects(screen: *mut RawSurface, numrects: c_int, rects: *const RawRect);
    fn SDL_Flip(screen: *mut RawSurface) -> c_int;

    fn SDL_WM_GetCaption(title: *mut *mut c_char, icon: *mut *mut c_char);
    fn SDL_WM_SetCaption(title: *const c_char, icon: *const c_char);
    fn SDL_WM_SetIcon(icon: *mut RawSurface, mask: *mut u8);
    fn SDL_WM_IconifyWindow() -> c_int;
    fn SDL_WM_ToggleFullScreen(surface: *mut RawSurface) -> c_int;
    fn SDL_GL_SwapBuffers();
    fn SDL_GL_SetAttribute(attr: c_int, value: c_int) -> c_int;

    fn SDL_CreateRGBSurface(
        flags: u32,
        width: c_int,
        height: c_int,
        depth: c_int,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface;
    fn SDL_CreateRGBSurfaceFrom(
        pixels: *mut c_void,
        width: c_int,
        height: c_int,
        depth: c_int,
        pitch: c_int,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface;
    fn SDL_FreeSurface(surface: *mut RawSurface);
    fn SDL_LockSurface(surface: *mut RawSurface) -> c_int;
    fn SDL_UnlockSurface(surface: *mut RawSurface);
    fn SDL_UpperBlit(
        src: *mut RawSurface,
        srcrect: *mut RawRect,
        dst: *mut RawSurface,
        dstrect: *mut RawRect,
    ) -> c_int;
    fn SDL_FillRect(dst: *mut RawSurface, dstrect: *mut RawRect, color: u32) -> c_int;
    fn SDL_SetAlpha(surface: *mut RawSurface, flag: u32, alpha: u8) -> c_int;
    fn SDL_SetColorKey(surface: *mut RawSurface, flag: u32, key: u32) -> c_int;
    fn SDL_GetClipRect(surface: *mut RawSurface, rect: *mut RawRect);
    fn SDL_SetClipRect(surface: *mut RawSurface, rect: *const RawRect) -> c_int;
    fn SDL_MapRGB(format: *const RawPixelFormat, r: u8, g: u8, b: u8) -> u32;
    fn SDL_MapRGBA(format: *const RawPixelFormat, r: u8, g: u8, b: u8, a: u8) -> u32;
    fn SDL_GetRGB(pixel: u32, format: *const RawPixelFormat, r: *mut u8, g: *mut u8, b: *mut u8);
    fn SDL_GetRGBA(
        pixel: u32,
        format: *const RawPixelFormat,
        r: *mut u8,
        g: *mut u8,
        b: *mut u8,
        a: *mut u8,
    );
    fn SDL_DisplayFormat(surface: *mut RawSurface) -> *mut RawSurface;
    fn SDL_DisplayFormatAlpha(surface: *mut RawSurface) -> *mut RawSurface;
    fn SDL_RWFromFile(file: *const c_char, mode: *const c_char) -> *mut c_void;
    fn SDL_SaveBMP_RW(surface: *mut RawSurface, dst: *mut c_void, freedst: c_int) -> c_int;

    fn SDL_EnableUNICODE(enable: c_int) -> c_int;
    fn SDL_EnableKeyRepeat(delay: c_int, interval: c_int) -> c_int;
    fn SDL_GetKeyRepeat(delay: *mut c_int, interval: *mut c_int);
    fn SDL_GetKeyState(numkeys: *mut c_int) -> *const u8;
    fn SDL_GetModState() -> c_int;
    fn SDL_SetModState(modstate: c_int);
    fn SDL_GetKeyName(key: c_int) -> *const c_char;

    fn SDL_PollEvent(event: *mut RawEvent) -> c_int;
    fn SDL_GetMouseState(x: *mut c_int, y: *mut c_int) -> u8;
    fn SDL_GetRelativeMouseState(x: *mut c_int, y: *mut c_int) -> u8;
    fn SDL_ShowCursor(toggle: c_int) -> c_int;

    fn SDL_NumJoysticks() -> c_int;
    fn SDL_JoystickName(device_index: c_int) -> *const c_char;
    fn SDL_JoystickOpen(device_index: c_int) -> *mut RawJoystick;
    fn SDL_JoystickOpened(device_index: c_int) -> c_int;
    fn SDL_JoystickUpdate();
    fn SDL_JoystickEventState(state: c_int) -> c_int;
    fn SDL_JoystickClose(joystick: *mut RawJoystick);
    fn SDL_JoystickIndex(joystick: *mut RawJoystick) -> c_int;
    fn SDL_JoystickNumAxes(joystick: *mut RawJoystick) -> c_int;
    fn SDL_JoystickNumButtons(joystick: *mut RawJoystick) -> c_int;
    fn SDL_JoystickNumBalls(joystick: *mut RawJoystick) -> c_int;
    fn SDL_JoystickNumHats(joystick: *mut RawJoystick) -> c_int;
    fn SDL_JoystickGetAxis(joystick: *mut RawJoystick, axis: c_int) -> i16;
    fn SDL_JoystickGetButton(joystick: *mut RawJoystick, button: c_int) -> u8;
    fn SDL_JoystickGetHat(joystick: *mut RawJoystick, hat: c_int) -> u8;
    fn SDL_JoystickGetBall(
        joystick: *mut RawJoystick,
        ball: c_int,
        dx: *mut c_int,
        dy: *mut c_int,
    ) -> c_int;

    fn SDL_GetTicks() -> u32;
}

#[link(name = "SDL_image")]
extern "C" {
    fn IMG_Load(file: *const c_char) -> *mut RawSurface;
}

#[link(name = "SDL_gfx")]
extern "C" {
    fn zoomSurface(
        src: *mut RawSurface,
        zoomx: c_double,
        zoomy: c_double,
        smooth: c_int,
    ) -> *mut RawSurface;
}

/// Copy a library-owned C string. Null maps to `None`.
unsafe fn owned_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    Some(CStr::from_ptr(ptr).to_string_lossy().into_owned())
}

/// The system SDL 1.2 library. There is only one per process.
#[derive(Debug, Default)]
pub struct Sdl12Library;

impl Sdl12Library {
    pub const fn new() -> Self {
        Self
    }
}

impl NativeLibrary for Sdl12Library {
    unsafe fn init(&self, flags: u32) -> i32 {
        SDL_Init(flags)
    }

    unsafe fn init_subsystem(&self, flags: u32) -> i32 {
        SDL_InitSubSystem(flags)
    }

    unsafe fn quit_subsystem(&self, flags: u32) {
        SDL_QuitSubSystem(flags)
    }

    unsafe fn was_init(&self, flags: u32) -> u32 {
        SDL_WasInit(flags)
    }

    unsafe fn quit(&self) {
        SDL_Quit()
    }

    unsafe fn get_error(&self) -> String {
        owned_string(SDL_GetError()).unwrap_or_default()
    }

    unsafe fn set_error(&self, message: &CStr) {
        SDL_SetError(c"%s".as_ptr(), message.as_ptr())
    }

    unsafe fn clear_error(&self) {
        SDL_ClearError()
    }

    unsafe fn set_video_mode(&self, w: i32, h: i32, bpp: i32, flags: u32) -> *mut RawSurface {
        SDL_SetVideoMode(w, h, bpp, flags)
    }

    unsafe fn video_mode_ok(&self, w: i32, h: i32, bpp: i32, flags: u32) -> i32 {
        SDL_VideoModeOK(w, h, bpp, flags)
    }

    unsafe fn list_modes(&self, format: *mut RawPixelFormat, flags: u32) -> *mut *mut RawRect {
        SDL_ListModes(format, flags)
    }

    unsafe fn get_video_info(&self) -> *const RawVideoInfo {
        SDL_GetVideoInfo()
    }

    unsafe fn update_rect(&self, screen: *mut RawSurface, x: i32, y: i32, w: u32, h: u32) {
        SDL_UpdateRect(screen, x, y, w, h)
    }

    unsafe fn update_rects(&self, screen: *mut RawSurface, count: i32, rects: *const RawRect) {
        SDL_UpdateRects(screen, count, rects)
    }

    unsafe fn flip(&self, screen: *mut RawSurface) -> i32 {
        SDL_Flip(screen)
    }

    unsafe fn wm_get_caption(&self) -> (Option<String>, Option<String>) {
        let mut title: *mut c_char = ptr::null_mut();
        let mut icon: *mut c_char = ptr::null_mut();
        SDL_WM_GetCaption(&mut title, &mut icon);
        (owned_string(title), owned_string(icon))
    }

    unsafe fn wm_set_caption(&self, title: &CStr, icon: &CStr) {
        SDL_WM_SetCaption(title.as_ptr(), icon.as_ptr())
    }

    unsafe fn wm_set_icon(&self, icon: *mut RawSurface, mask: *mut u8) {
        SDL_WM_SetIcon(icon, mask)
    }

    unsafe fn wm_iconify_window(&self) -> i32 {
        SDL_WM_IconifyWindow()
    }

    unsafe fn wm_toggle_fullscreen(&self, surface: *mut RawSurface) -> i32 {
        SDL_WM_ToggleFullScreen(surface)
    }

    unsafe fn gl_swap_buffers(&self) {
        SDL_GL_SwapBuffers()
    }

    unsafe fn gl_set_attribute(&self, attr: i32, value: i32) -> i32 {
        SDL_GL_SetAttribute(attr, value)
    }

    unsafe fn create_rgb_surface(
        &self,
        flags: u32,
        width: i32,
        height: i32,
        depth: i32,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface {
        SDL_CreateRGBSurface(flags, width, height, depth, rmask, gmask, bmask, amask)
    }

    unsafe fn create_rgb_surface_from(
        &self,
        pixels: *mut c_void,
        width: i32,
        height: i32,
        depth: i32,
        pitch: i32,
        rmask: u32,
        gmask: u32,
        bmask: u32,
        amask: u32,
    ) -> *mut RawSurface {
        SDL_CreateRGBSurfaceFrom(pixels, width, height, depth, pitch, rmask, gmask, bmask, amask)
    }

    unsafe fn free_surface(&self, surface: *mut RawSurface) {
        SDL_FreeSurface(surface)
    }

    unsafe fn lock_surface(&self, surface: *mut RawSurface) -> i32 {
        SDL_LockSurface(surface)
    }

    unsafe fn unlock_surface(&self, surface: *mut RawSurface) {
        SDL_UnlockSurface(surface)
    }

    unsafe fn upper_blit(
        &self,
        src: *mut RawSurface,
        src_rect: *mut RawRect,
        dst: *mut RawSurface,
        dst_rect: *mut RawRect,
    ) -> i32 {
        SDL_UpperBlit(src, src_rect, dst, dst_rect)
    }

    unsafe fn fill_rect(&self, dst: *mut RawSurface, rect: *mut RawRect, color: u32) -> i32 {
        SDL_FillRect(dst, rect, color)
    }

    unsafe fn set_alpha(&self, surface: *mut RawSurface, flags: u32, alpha: u8) -> i32 {
        SDL_SetAlpha(surface, flags, alpha)
    }

    unsafe fn set_color_key(&self, surface: *mut RawSurface, flags: u32, key: u32) -> i32 {
        SDL_SetColorKey(surface, flags, key)
    }

    unsafe fn get_clip_rect(&self, surface: *mut RawSurface, rect: *mut RawRect) {
        SDL_GetClipRect(surface, rect)
    }

    unsafe fn set_clip_rect(&self, surface: *mut RawSurface, rect: *const RawRect) -> bool {
        SDL_SetClipRect(surface, rect) != 0
    }

    unsafe fn map_rgb(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8) -> u32 {
        SDL_MapRGB(format, r, g, b)
    }

    unsafe fn map_rgba(&self, format: *const RawPixelFormat, r: u8, g: u8, b: u8, a: u8) -> u32 {
        SDL_MapRGBA(format, r, g, b, a)
    }

    unsafe fn get_rgb(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8) {
        let (mut r, mut g, mut b) = (0, 0, 0);
        SDL_GetRGB(pixel, format, &mut r, &mut g, &mut b);
        (r, g, b)
    }

    unsafe fn get_rgba(&self, pixel: u32, format: *const RawPixelFormat) -> (u8, u8, u8, u8) {
        let (mut r, mut g, mut b, mut a) = (0, 0, 0, 0);
        SDL_GetRGBA(pixel, format, &mut r, &mut g, &mut b, &mut a);
        (r, g, b, a)
    }

    unsafe fn display_format(&self, surface: *mut RawSurface) -> *mut RawSurface {
        SDL_DisplayFormat(surface)
    }

    unsafe fn display_format_alpha(&self, surface: *mut RawSurface) -> *mut RawSurface {
        SDL_DisplayFormatAlpha(surface)
    }

    unsafe fn load(&self, file: &CStr) -> *mut RawSurface {
        IMG_Load(file.as_ptr())
    }

    unsafe fn save_bmp(&self, surface: *mut RawSurface, file: &CStr) -> i32 {
        // SDL_SaveBMP is a macro over the RWops variant.
        let rw = SDL_RWFromFile(file.as_ptr(), c"wb".as_ptr());
        SDL_SaveBMP_RW(surface, rw, 1)
    }

    unsafe fn zoom_surface(
        &self,
        surface: *mut RawSurface,
        zoom_x: f64,
        zoom_y: f64,
        smooth: bool,
    ) -> *mut RawSurface {
        zoomSurface(surface, zoom_x, zoom_y, c_int::from(smooth))
    }

    unsafe fn enable_unicode(&self, enable: i32) -> i32 {
        SDL_EnableUNICODE(enable)
    }

    unsafe fn enable_key_repeat(&self, delay: i32, interval: i32) -> i32 {
        SDL_EnableKeyRepeat(delay, interval)
    }

    unsafe fn get_key_repeat(&self) -> (i32, i32) {
        let (mut delay, mut interval) = (0, 0);
        SDL_GetKeyRepeat(&mut delay, &mut interval);
        (delay, interval)
    }

    unsafe fn get_key_state(&self) -> (*const u8, i32) {
        let mut numkeys = 0;
        let keys = SDL_GetKeyState(&mut numkeys);
        (keys, numkeys)
    }

    unsafe fn get_mod_state(&self) -> i32 {
        SDL_GetModState()
    }

    unsafe fn set_mod_state(&self, modstate: i32) {
        SDL_SetModState(modstate)
    }

    unsafe fn get_key_name(&self, key: i32) -> String {
        owned_string(SDL_GetKeyName(key)).unwrap_or_default()
    }

    unsafe fn poll_event(&self, event: *mut RawEvent) -> i32 {
        SDL_PollEvent(event)
    }

    unsafe fn get_mouse_state(&self) -> (u8, i32, i32) {
        let (mut x, mut y) = (0, 0);
        let buttons = SDL_GetMouseState(&mut x, &mut y);
        (buttons, x, y)
    }

    unsafe fn get_relative_mouse_state(&self) -> (u8, i32, i32) {
        let (mut x, mut y) = (0, 0);
        let buttons = SDL_GetRelativeMouseState(&mut x, &mut y);
        (buttons, x, y)
    }

    unsafe fn show_cursor(&self, toggle: i32) -> i32 {
        SDL_ShowCursor(toggle)
    }

    unsafe fn num_joysticks(&self) -> i32 {
        SDL_NumJoysticks()
    }

    unsafe fn joystick_name(&self, device_index: i32) -> Option<String> {
        owned_string(SDL_JoystickName(device_index))
    }

    unsafe fn joystick_open(&self, device_index: i32) -> *mut RawJoystick {
        SDL_JoystickOpen(device_index)
    }

    unsafe fn joystick_opened(&self, device_index: i32) -> i32 {
        SDL_JoystickOpened(device_index)
    }

    unsafe fn joystick_update(&self) {
        SDL_JoystickUpdate()
    }

    unsafe fn joystick_event_state(&self, state: i32) -> i32 {
        SDL_JoystickEventState(state)
    }

    unsafe fn joystick_close(&self, joystick: *mut RawJoystick) {
        SDL_JoystickClose(joystick)
    }

    unsafe fn joystick_index(&self, joystick: *mut RawJoystick) -> i32 {
        SDL_JoystickIndex(joystick)
    }

    unsafe fn joystick_num_axes(&self, joystick: *mut RawJoystick) -> i32 {
        SDL_JoystickNumAxes(joystick)
    }

    unsafe fn joystick_num_buttons(&self, joystick: *mut RawJoystick) -> i32 {
        SDL_JoystickNumButtons(joystick)
    }

    unsafe fn joystick_num_balls(&self, joystick: *mut RawJoystick) -> i32 {
        SDL_JoystickNumBalls(joystick)
    }

    unsafe fn joystick_num_hats(&self, joystick: *mut RawJoystick) -> i32 {
        SDL_JoystickNumHats(joystick)
    }

    unsafe fn joystick_get_axis(&self, joystick: *mut RawJoystick, axis: i32) -> i16 {
        SDL_JoystickGetAxis(joystick, axis)
    }

    unsafe fn joystick_get_button(&self, joystick: *mut RawJoystick, button: i32) -> u8 {
        SDL_JoystickGetButton(joystick, button)
    }

    unsafe fn joystick_get_hat(&self, joystick: *mut RawJoystick, hat: i32) -> u8 {
        SDL_JoystickGetHat(joystick, hat)
    }

    unsafe fn joystick_get_ball(&self, joystick: *mut RawJoystick, ball: i32) -> (i32, i32, i32) {
        let (mut dx, mut dy) = (0, 0);
        let status = SDL_JoystickGetBall(joystick, ball, &mut dx, &mut dy);
        (status, dx, dy)
    }

    unsafe fn get_ticks(&self) -> u32 {
        SDL_GetTicks()
    }
}
