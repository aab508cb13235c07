use chrono::NaiveDateTime;
use rand::Rng;

pub const OTP_MIN: u32 = 100_000;
pub const OTP_MAX: u32 = 999_999;
pub const OTP_TTL_MINUTES: i64 = 10;

pub const OTP_SUBJECT: &str = "One-Time Password (OTP) for Account Verification";

pub fn generate() -> u32 {
    rand::thread_rng().gen_range(OTP_MIN..=OTP_MAX)
}

/// Expired once strictly more than ten minutes have passed; a missing timestamp is expired
pub fn is_expired(issued_at: Option<NaiveDateTime>, now: NaiveDateTime) -> bool {
    match issued_at {
        Some(issued_at) => (now - issued_at).num_seconds() > OTP_TTL_MINUTES * 60,
        None => true,
    }
}

pub fn mail_body(otp: u32) -> String {
    format!(
        "<div style='padding: 20px; margin: auto;'>\
           <div style='margin: auto; max-width: 550px; margin-top: 40px; padding: 20px 30px; \
             border: 1px solid #e5e5e5; border-radius: 20px; background-color: white'>\
             <h2 style='text-align: center; margin-bottom: 20px;'>Verify it's you</h2>\
             <p>Your One-Time Password (OTP) is:</p>\
             <div style='display: flex; justify-content: center;'>\
               <b style='font-size: 26px; letter-spacing: 10px; padding: 15px; margin: 20px 0px;'>{otp}</b>\
             </div>\
             <p>This code is valid for {ttl} minutes. Do not share this code with anyone.</p>\
             <i>This is an automated message. Please do not reply.</i>\
           </div>\
         </div>",
        otp = otp,
        ttl = OTP_TTL_MINUTES
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, NaiveDate};

    #[test]
    fn codes_are_six_digits() {
        for _ in 0..1000 {
            let code = generate();
            assert!((OTP_MIN..=OTP_MAX).contains(&code));
            assert_eq!(code.to_string().len(), 6);
        }
    }

    #[test]
    fn expiry_boundary() {
        let issued = NaiveDate::from_ymd_opt(2025, 3, 1).unwrap().and_hms_opt(9, 0, 0).unwrap();
        assert!(!is_expired(Some(issued), issued + Duration::minutes(10)));
        assert!(is_expired(Some(issued), issued + Duration::minutes(10) + Duration::seconds(1)));
        assert!(!is_expired(Some(issued), issued + Duration::seconds(5)));
        assert!(is_expired(None, issued));
    }

    #[test]
    fn mail_carries_the_code() {
        let body = mail_body(123456);
        assert!(body.contains("123456"));
        assert!(body.contains("valid for 10 minutes"));
    }
}
