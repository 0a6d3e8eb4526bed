pub mod barber;
pub mod booking;
pub mod interval;
pub mod notification;
pub mod service;
pub mod user;
pub mod working_hours;

pub use barber::Barber;
pub use booking::{Booking, BookingServiceLine, BookingStatus, NewBooking};
pub use interval::Interval;
pub use notification::{
    BookingDetails, ChannelKind, ChannelResult, DispatchReport, Notification, ServiceSummary,
};
pub use service::{Service, ServiceCategory};
pub use user::{Requester, Role, User};
pub use working_hours::WorkingHours;
